//! Standalone helpers with no state of their own.

/// Luhn (mod-10) checksum, the same algorithm used to validate credit card numbers.
/// Order numbers are accepted only if they pass this check.
pub fn is_valid_order_number(number: i64) -> bool {
    if number <= 0 {
        return false;
    }

    let digits: Vec<u32> = number
        .to_string()
        .chars()
        .rev()
        .map(|c| c.to_digit(10).expect("number is all decimal digits"))
        .collect();

    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_good_numbers() {
        assert!(is_valid_order_number(79927398713));
        assert!(is_valid_order_number(12345678903));
        assert!(is_valid_order_number(4539148803436467));
    }

    #[test]
    fn rejects_bad_checksum() {
        assert!(!is_valid_order_number(79927398714));
        assert!(!is_valid_order_number(1));
    }

    #[test]
    fn rejects_non_positive() {
        assert!(!is_valid_order_number(0));
        assert!(!is_valid_order_number(-79927398713));
    }
}
