//! Price helpers.
//!
//! Prices travel as text everywhere (catalog responses, cache rows, remote
//! documents). Arithmetic only happens here.

/// Parse a price string, treating anything non-numeric as zero.
///
/// Surrounding whitespace and a leading `$` are ignored.
#[must_use]
pub fn parse_price(price: &str) -> f64 {
    let trimmed = price.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Format an amount with two decimals.
#[must_use]
pub fn format_price(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Sum of `price * quantity` over grocery-list line items, rounded to cents.
#[must_use]
pub fn grocery_total<'a, I>(lines: I) -> f64
where
    I: IntoIterator<Item = (&'a str, u32)>,
{
    let total: f64 = lines
        .into_iter()
        .map(|(price, quantity)| parse_price(price) * f64::from(quantity))
        .sum();
    (total * 100.0).round() / 100.0
}

/// Pick the price to show for a catalog product.
///
/// The regular price wins when both are present; the promotional price is
/// used only when there is no regular price.
#[must_use]
pub fn select_price(regular: Option<&str>, promo: Option<&str>) -> Option<String> {
    regular.or(promo).map(ToString::to_string)
}
