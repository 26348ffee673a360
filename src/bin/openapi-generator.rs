//! Print the OpenAPI document to stdout.

use utoipa::OpenApi;
use word_clash_back::services::documentation::ApiDoc;

fn main() {
    let doc = ApiDoc::openapi();
    println!("{}", doc.to_pretty_json().unwrap());
}
