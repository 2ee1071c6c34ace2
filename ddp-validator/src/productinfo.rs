//! Information about this project.

/// The formal name of this product.
pub const PRODUCT_NAME: &str = "ddp-validator";

/// The version of the product, in string form.
pub const PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One-line description of the product.
pub const PRODUCT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub(crate) fn get_product_display_str() -> String {
    std::format!("{PRODUCT_NAME} version {PRODUCT_VERSION} - {PRODUCT_DESCRIPTION}")
}
