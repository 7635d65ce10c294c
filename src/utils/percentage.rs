use std::{fmt::Display, ops::Deref};

/// Share of one quantity in another, expressed in percent. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.rounded())
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage(value))
        }
    }

    /// Whole-number percentage as shown to the user.
    pub fn rounded(&self) -> u8 {
        self.0.round().clamp(0., 100.) as u8
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Productive share of the tracked time. Zero while nothing has been tracked.
pub fn efficiency(productive_seconds: f64, total_seconds: f64) -> Percentage {
    if total_seconds <= 0. {
        return Percentage::default();
    }
    Percentage::new_opt(productive_seconds / total_seconds * 100.).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::efficiency;

    #[test]
    fn test_efficiency() {
        assert_eq!(*efficiency(0., 0.), 0.);
        assert_eq!(*efficiency(2., 5.), 40.);
        assert_eq!(efficiency(5., 5.).rounded(), 100);
        assert_eq!(efficiency(1., 3.).rounded(), 33);
        assert_eq!(efficiency(2., 3.).to_string(), "67%");
    }
}
