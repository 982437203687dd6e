use clap::Args;
use catalog_app::{
    database,
    domain::{
        assets::models::AssetLocator,
        products::{PgProductsRepository, ProductsRepository},
    },
};

#[derive(Debug, Args)]
pub(crate) struct ListProductsArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

pub(crate) async fn run(args: ListProductsArgs) -> Result<(), String> {
    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let products = PgProductsRepository::new(pool)
        .list_products()
        .await
        .map_err(|error| format!("failed to list products: {error}"))?;

    if products.is_empty() {
        println!("no products found");
        return Ok(());
    }

    for product in products {
        println!("product_uuid: {}", product.uuid);
        println!("code: {}", product.code);
        println!("name: {}", product.name);
        println!("price: {}", product.price);

        for (address, asset) in product.assets.iter() {
            match asset.locate(product.uuid, address) {
                AssetLocator::Reference(key) => println!("  {address}: {key}"),
                AssetLocator::Retrieval { .. } => println!("  {address}: inline"),
            }
        }

        println!();
    }

    Ok(())
}
