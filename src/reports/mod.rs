//! Rendering of the sales report for download.

pub mod pdf;

use rust_decimal::{Decimal, RoundingStrategy};

pub use pdf::{render_sales_report, render_sales_report_blocking, PdfOptions};

/// Two decimal places with `.` as the separator, prefixed by the currency code.
pub fn format_money(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{} {:.2}", currency, rounded)
}

/// The built-in PDF fonts only cover Latin-1 glyphs reliably; accented
/// letters are folded to their base letter and anything else becomes `?`.
pub fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect()
}

/// Shortens `text` to `max` characters, marking the cut with "..".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(2)).collect();
        format!("{}..", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_is_rounded_to_cents() {
        assert_eq!(format_money(dec!(34.5), "BRL"), "BRL 34.50");
        assert_eq!(format_money(dec!(0.005), "BRL"), "BRL 0.01");
        assert_eq!(format_money(dec!(1200), "AOA"), "AOA 1200.00");
    }

    #[test]
    fn accents_are_folded() {
        assert_eq!(pdf_safe("Feijão Preto"), "Feijao Preto");
        assert_eq!(pdf_safe("Armazém → Loja"), "Armazem ? Loja");
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate("Arroz", 10), "Arroz");
        assert_eq!(truncate("Arroz Agulhinha Tipo 1", 10), "Arroz Ag..");
    }
}
