use crate::ledger::csv_export::format_amount;
use rust_decimal::Decimal;

/// `€1,234.50` style display for reports. Negative amounts keep their sign
/// in front of the symbol.
pub fn display_money(symbol: &str, amount: Decimal) -> String {
    let plain = format_amount(amount.abs());
    let (whole, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < Decimal::ZERO { "-" } else { "" };
    format!("{}{}{}.{}", sign, symbol, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        let d = |s: &str| s.parse::<Decimal>().unwrap();
        assert_eq!(display_money("€", d("1234.5")), "€1,234.50");
        assert_eq!(display_money("€", d("-30")), "-€30.00");
        assert_eq!(display_money("$", d("999")), "$999.00");
        assert_eq!(display_money("€", d("1000000")), "€1,000,000.00");
    }
}
