use std::fmt::{self, Debug, Display};

/// 欠損値（NA, Not Available）を表現する型
///
/// A numeric cell that was blank or could not be parsed is kept as `NA::NA`
/// so the smoother can substitute its own level instead of guessing a value.
#[derive(Clone, Copy)]
pub enum NA<T> {
    /// 値が存在する場合
    Value(T),
    /// 値が存在しない場合
    NA,
}

impl<T> NA<T> {
    /// 値があるかどうかをチェック
    pub fn is_na(&self) -> bool {
        match self {
            NA::Value(_) => false,
            NA::NA => true,
        }
    }

    pub fn is_value(&self) -> bool {
        !self.is_na()
    }

    /// 値を取得（存在する場合）
    pub fn value(&self) -> Option<&T> {
        match self {
            NA::Value(v) => Some(v),
            NA::NA => None,
        }
    }

    /// 値を変換する
    pub fn map<U, F>(&self, f: F) -> NA<U>
    where
        F: FnOnce(&T) -> U,
    {
        match self {
            NA::Value(v) => NA::Value(f(v)),
            NA::NA => NA::NA,
        }
    }
}

impl<T: Copy> NA<T> {
    /// Returns the value, or `fill` when missing.
    pub fn or_fill(&self, fill: T) -> T {
        match self {
            NA::Value(v) => *v,
            NA::NA => fill,
        }
    }
}

impl NA<f64> {
    /// Treats non-finite results (NaN, ±inf) as missing.
    pub fn finite(value: f64) -> Self {
        if value.is_finite() {
            NA::Value(value)
        } else {
            NA::NA
        }
    }

    /// Renders the value as a table cell; missing values become an empty cell.
    pub fn to_cell(&self) -> String {
        match self {
            NA::Value(v) => v.to_string(),
            NA::NA => String::new(),
        }
    }
}

// From実装：T型からNA<T>への自動変換
impl<T> From<T> for NA<T> {
    fn from(value: T) -> Self {
        NA::Value(value)
    }
}

impl<T> From<Option<T>> for NA<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => NA::Value(v),
            None => NA::NA,
        }
    }
}

impl<T> From<NA<T>> for Option<T> {
    fn from(na: NA<T>) -> Self {
        match na {
            NA::Value(v) => Some(v),
            NA::NA => None,
        }
    }
}

impl<T: Debug> Debug for NA<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NA::Value(v) => write!(f, "{:?}", v),
            NA::NA => write!(f, "NA"),
        }
    }
}

impl<T: Display> Display for NA<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NA::Value(v) => write!(f, "{}", v),
            NA::NA => write!(f, "NA"),
        }
    }
}

impl<T: PartialEq> PartialEq for NA<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NA::Value(a), NA::Value(b)) => a == b,
            (NA::NA, NA::NA) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_fill() {
        assert_eq!(NA::Value(2.0).or_fill(7.0), 2.0);
        assert_eq!(NA::<f64>::NA.or_fill(7.0), 7.0);
    }

    #[test]
    fn test_finite_and_cell() {
        assert!(NA::finite(f64::NAN).is_na());
        assert!(NA::finite(f64::INFINITY).is_na());
        assert_eq!(NA::finite(1.5).to_cell(), "1.5");
        assert_eq!(NA::<f64>::NA.to_cell(), "");
    }

    #[test]
    fn test_option_conversion() {
        let na: NA<i32> = None.into();
        assert!(na.is_na());
        let back: Option<i32> = NA::Value(3).into();
        assert_eq!(back, Some(3));
    }
}
