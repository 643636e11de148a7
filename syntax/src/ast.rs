/// type alias just to make type signatures look more consistent.
pub type Ident<'a> = &'a str;

/// One declared input, e.g. `size=10` or `done`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Param<'a> {
    /// name used to look up a provider for this input
    pub name: Ident<'a>,
    /// raw, trimmed text of the default expression, if there was one
    pub default: Option<&'a str>,
}

impl<'a> Param<'a> {
    pub fn new(name: Ident<'a>, default: Option<&'a str>) -> Self {
        Self { name, default }
    }
}

// These methods are just to assist with writing more legible tests.
#[cfg(test)]
impl<'a> Param<'a> {
    pub fn bare(name: Ident<'a>) -> Self {
        Self::new(name, None)
    }
    pub fn with_default(name: Ident<'a>, default: &'a str) -> Self {
        Self::new(name, Some(default))
    }
}
