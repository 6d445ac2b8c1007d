use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Located<T> {
    pub data: T,
    pub location: Option<Location>,
}

/// Zero-based position of a character in the source text.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Location {
    pub row: u32,
    pub col: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.row + 1, self.col + 1)
    }
}

pub trait ToLocated {
    fn with_locate(self, location: Location) -> Located<Self>
    where
        Self: Sized,
    {
        Located::<Self> {
            data: self,
            location: Some(location),
        }
    }

    fn with_location(self, location: Option<Location>) -> Located<Self>
    where
        Self: Sized,
    {
        Located::<Self> {
            data: self,
            location,
        }
    }
}

impl<T> Located<T> {
    pub fn extract(self) -> T {
        self.data
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Located<U> {
        Located {
            data: f(self.data),
            location: self.location,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Located<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "{} at {}", self.data, location),
            None => write!(f, "{}", self.data),
        }
    }
}

impl<T: std::error::Error + 'static> std::error::Error for Located<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.data.source()
    }
}
