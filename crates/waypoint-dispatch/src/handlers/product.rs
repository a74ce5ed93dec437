//! `product.search` — reserved stub. No product data flow exists yet, so
//! this always returns an empty result set.

use waypoint_intent::intent::ProductSearchParams;

use crate::error::Result;
use crate::response::ProcessResponse;

pub fn search(params: &ProductSearchParams) -> Result<ProcessResponse> {
    Ok(ProcessResponse::final_text(format!(
        "Поиск товаров пока недоступен (запрос «{}»).",
        params.query
    )))
}
