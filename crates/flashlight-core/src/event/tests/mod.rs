
#[cfg(test)]
mod tests {
    use crate::event::Priority;

    #[test]
    fn test_priority_default() {
        assert_eq!(Priority::default(), Priority::NORMAL);
    }

    #[test]
    fn test_priority_values() {
        assert_eq!(Priority::HIGHEST.value(), 127);
        assert_eq!(Priority::HIGHER.value(), 25);
        assert_eq!(Priority::HIGH.value(), 10);
        assert_eq!(Priority::NORMAL.value(), 0);
        assert_eq!(Priority::LOW.value(), -10);
        assert_eq!(Priority::LOWER.value(), -25);
        assert_eq!(Priority::LOWEST.value(), -128);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::HIGHEST > Priority::HIGHER);
        assert!(Priority::HIGHER > Priority::HIGH);
        assert!(Priority::HIGH > Priority::NORMAL);
        assert!(Priority::NORMAL > Priority::LOW);
        assert!(Priority::LOW > Priority::LOWER);
        assert!(Priority::LOWER > Priority::LOWEST);
        assert_eq!(Priority::from(10), Priority::HIGH);
    }
}
