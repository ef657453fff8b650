//! OpenAPI document for the recipe API, served at `/openapi.json`.

use crate::api_recipes::{self, ErrorBody};
use cookbook_recipes::{NewRecipe, Recipe};
use utoipa::openapi::{InfoBuilder, OpenApi as OpenApiDoc, OpenApiBuilder};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api_recipes::list_recipes_handler,
        api_recipes::get_recipe_handler,
        api_recipes::create_recipe_handler,
    ),
    components(schemas(Recipe, NewRecipe, ErrorBody))
)]
struct RecipeApi;

pub fn doc() -> OpenApiDoc {
    OpenApiBuilder::from(RecipeApi::openapi())
        .info(
            InfoBuilder::new()
                .title("Cookbook API")
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some(
                    "Recipe management: create recipes, list them by popularity, and view details.",
                ))
                .build(),
        )
        .build()
}
