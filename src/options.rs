/// Options for filtering filing requests
#[derive(Debug, Clone)]
pub struct FilingOptions {
    pub form_types: Option<Vec<String>>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    /// Whether to automatically include amendment forms (e.g., 13F-HR/A when 13F-HR is requested).
    /// Defaults to true.
    pub include_amendments: bool,
}

impl Default for FilingOptions {
    fn default() -> Self {
        Self {
            form_types: None,
            offset: None,
            limit: None,
            include_amendments: true,
        }
    }
}

impl FilingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form_type(mut self, form_type: impl Into<String>) -> Self {
        self.form_types = Some(vec![form_type.into()]);
        self
    }

    pub fn with_form_types(mut self, form_types: Vec<String>) -> Self {
        self.form_types = Some(form_types);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set whether to include amendment forms automatically.
    ///
    /// When true (default), requesting "13F-HR" will also include "13F-HR/A" filings.
    /// When false, only the exact form type specified will be returned.
    pub fn with_include_amendments(mut self, include_amendments: bool) -> Self {
        self.include_amendments = include_amendments;
        self
    }

    /// Returns true if a filing of `form` passes the form type filter.
    pub fn matches_form(&self, form: &str) -> bool {
        let Some(form_types) = &self.form_types else {
            return true;
        };
        let form = form.trim();
        form_types.iter().any(|requested| {
            form == requested
                || (self.include_amendments
                    && form
                        .strip_suffix("/A")
                        .is_some_and(|base| base == requested))
        })
    }
}
