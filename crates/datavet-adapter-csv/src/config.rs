//! CSV configuration options

/// Configuration for reading delimited text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvConfig {
    /// Field delimiter character (default: comma)
    pub delimiter: char,
    /// Quote character (default: double quote)
    pub quote_char: char,
    /// Whether the first record is a header row (default: true)
    pub has_header: bool,
    /// Declared text encoding (default: UTF-8)
    pub encoding: Encoding,
    /// Trim surrounding whitespace from every field (default: false)
    pub trim: bool,
}

/// Text encoding options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8, with BOM detection (default)
    Utf8,
    /// ISO-8859-1
    Latin1,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote_char: '"',
            has_header: true,
            encoding: Encoding::Utf8,
            trim: false,
        }
    }
}

impl CsvConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delimiter character
    #[must_use]
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote character
    #[must_use]
    pub fn quote_char(mut self, quote_char: char) -> Self {
        self.quote_char = quote_char;
        self
    }

    /// Configure header presence
    #[must_use]
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Disable header row
    #[must_use]
    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }

    /// Set encoding
    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Trim whitespace around fields
    #[must_use]
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Delimiter as a byte for the csv crate; `None` for non-ASCII characters
    #[must_use]
    pub fn delimiter_u8(&self) -> Option<u8> {
        u8::try_from(self.delimiter).ok().filter(u8::is_ascii)
    }

    /// Quote character as a byte for the csv crate
    #[must_use]
    pub fn quote_char_u8(&self) -> Option<u8> {
        u8::try_from(self.quote_char).ok().filter(u8::is_ascii)
    }
}
