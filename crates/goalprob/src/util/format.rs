/// Group whole rupees the Indian way: last three digits, then pairs
fn group_indian(whole: u64) -> String {
    let digits = whole.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 2);
    for (i, c) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped.push(',');
    grouped.push_str(tail);
    grouped
}

/// Format a rupee amount rounded to whole rupees (e.g. ₹3,00,000)
pub fn format_inr(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let whole = value.abs().round() as u64;
    let sign = if value < 0.0 && whole > 0 { "-" } else { "" };
    format!("{sign}₹{}", group_indian(whole))
}

/// Format a rupee amount in lakh / crore units (e.g. ₹2.50 Cr, ₹45.00 L)
pub fn format_inr_compact(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let abs_value = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };

    if abs_value >= 10_000_000.0 {
        format!("{sign}₹{:.2} Cr", abs_value / 10_000_000.0)
    } else if abs_value >= 100_000.0 {
        format!("{sign}₹{:.2} L", abs_value / 100_000.0)
    } else {
        format!("{sign}₹{}", group_indian(abs_value.round() as u64))
    }
}

/// Format a fraction as a percentage with one decimal
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Format a month count as years, or "not reached"
pub fn format_duration_months(months: Option<f64>) -> String {
    match months {
        Some(m) if m < 12.0 => format!("{m:.0} months"),
        Some(m) => format!("{:.1} years", m / 12.0),
        None => "not reached".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indian_grouping() {
        assert_eq!(format_inr(0.0), "₹0");
        assert_eq!(format_inr(999.0), "₹999");
        assert_eq!(format_inr(1_000.0), "₹1,000");
        assert_eq!(format_inr(300_000.0), "₹3,00,000");
        assert_eq!(format_inr(1_234_567.0), "₹12,34,567");
        assert_eq!(format_inr(12_345_678.9), "₹1,23,45,679");
        assert_eq!(format_inr(-50_000.0), "-₹50,000");
    }

    #[test]
    fn test_non_finite_amount() {
        assert_eq!(format_inr(f64::NAN), "n/a");
        assert_eq!(format_inr_compact(f64::INFINITY), "n/a");
    }

    #[test]
    fn test_compact_units() {
        assert_eq!(format_inr_compact(25_000_000.0), "₹2.50 Cr");
        assert_eq!(format_inr_compact(4_500_000.0), "₹45.00 L");
        assert_eq!(format_inr_compact(45_000.0), "₹45,000");
    }

    #[test]
    fn test_percentage_and_duration() {
        assert_eq!(format_percentage(0.8734), "87.3%");
        assert_eq!(format_duration_months(Some(6.0)), "6 months");
        assert_eq!(format_duration_months(Some(42.0)), "3.5 years");
        assert_eq!(format_duration_months(None), "not reached");
    }
}
