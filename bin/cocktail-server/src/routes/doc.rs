use utoipa::OpenApi;

use crate::routes::{health, mix};

#[derive(OpenApi)]
#[openapi(info(
    title = "cocktail-server",
    description = "Mix pretrained language and embedding models into one",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(mix::MixApi::openapi());
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn documents_every_route() {
        let docs = get_docs();
        for path in [
            "/health",
            "/mix_models",
            "/mix_models_with_data",
            "/mix_models_by_layers",
        ] {
            assert!(docs.paths.paths.contains_key(path), "{path} missing from OpenAPI");
        }
    }
}
