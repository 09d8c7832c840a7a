//! Schema model definitions
#![allow(clippy::must_use_candidate)]

use crate::pattern;
use datavet_expr::Expr;
use std::fmt;

/// A complete, validated schema document
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub metadata: Metadata,

    /// Datasets in declaration order
    pub datasets: Vec<DatasetSpec>,

    /// Packages in declaration order
    pub packages: Vec<PackageSpec>,
}

impl SchemaDocument {
    /// Find a dataset by name
    pub fn dataset(&self, name: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Find a package by name
    pub fn package(&self, name: &str) -> Option<&PackageSpec> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Member datasets of a package, in the package's order
    pub fn members<'a>(&'a self, package: &'a PackageSpec) -> impl Iterator<Item = &'a DatasetSpec> {
        package.datasets.iter().filter_map(move |name| self.dataset(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    pub author: Option<String>,
    pub description: Option<String>,
}

/// Shape of one tabular file
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSpec {
    pub name: String,

    /// Glob matched against file names (case-insensitive)
    pub file_pattern: String,

    pub format: FileFormat,
    pub fields: Vec<FieldSpec>,
    pub row_rules: Vec<ValidationRule>,
    pub dataset_rules: Vec<ValidationRule>,
}

impl DatasetSpec {
    /// Whether a file name matches this dataset's pattern
    pub fn matches(&self, file_name: &str) -> bool {
        pattern::matches_file_name(&self.file_pattern, file_name)
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Whether the dataset declares a header row
    pub fn has_header(&self) -> bool {
        match &self.format {
            FileFormat::Csv(csv) => csv.header,
            FileFormat::Excel(excel) => excel.header,
        }
    }

    /// Every rule attached to the dataset or its fields
    pub fn rule_count(&self) -> usize {
        self.row_rules.len()
            + self.dataset_rules.len()
            + self.fields.iter().map(|f| f.rules.len()).sum::<usize>()
    }
}

/// How a dataset is encoded on disk
#[derive(Debug, Clone, PartialEq)]
pub enum FileFormat {
    Csv(CsvFormat),
    Excel(ExcelFormat),
}

impl FileFormat {
    /// Container kind this format belongs to
    pub fn container(&self) -> ContainerFormat {
        match self {
            FileFormat::Csv(_) => ContainerFormat::Csv,
            FileFormat::Excel(_) => ContainerFormat::Excel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub quote: u8,
    pub header: bool,
    pub encoding: TextEncoding,

    /// Trim surrounding whitespace from every cell
    pub trim: bool,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            header: true,
            encoding: TextEncoding::Utf8,
            trim: false,
        }
    }
}

/// Declared text encoding of a delimited file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcelFormat {
    /// Sheet to read; the first sheet when absent
    pub sheet: Option<String>,
    pub header: bool,
}

impl Default for ExcelFormat {
    fn default() -> Self {
        Self {
            sheet: None,
            header: true,
        }
    }
}

/// One declared column
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
    pub default: Option<String>,

    /// Allowed values of an `enum` field
    pub options: Vec<String>,

    /// chrono format strings accepted by a `date` field
    pub formats: Vec<String>,

    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,

    /// Regex the whole value must match
    pub pattern: Option<String>,

    pub rules: Vec<ValidationRule>,
}

impl FieldSpec {
    /// A minimal optional field of the given type
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            unique: false,
            default: None,
            options: Vec::new(),
            formats: Vec::new(),
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            pattern: None,
            rules: Vec::new(),
        }
    }
}

/// Closed set of column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Decimal,
    Integer,
    Date,
    Boolean,
    Enum,
}

impl FieldType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "text" | "string" => Some(FieldType::Text),
            "decimal" | "float" | "number" => Some(FieldType::Decimal),
            "integer" | "int" => Some(FieldType::Integer),
            "date" => Some(FieldType::Date),
            "boolean" | "bool" => Some(FieldType::Boolean),
            "enum" => Some(FieldType::Enum),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Decimal => "decimal",
            FieldType::Integer => "integer",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
            FieldType::Enum => "enum",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl Severity {
    /// Parse a severity; only the exact lowercase names are accepted
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// One named predicate with its parsed expression
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRule {
    pub name: String,

    /// Message reported when the rule fails
    pub description: String,

    pub expression: String,
    pub severity: Severity,
    pub expr: Expr,
}

/// Container a package is delivered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    Zip,
    Csv,
    Excel,
}

impl ContainerFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "zip" => Some(ContainerFormat::Zip),
            "csv" => Some(ContainerFormat::Csv),
            "excel" | "xlsx" => Some(ContainerFormat::Excel),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContainerFormat::Zip => "zip",
            ContainerFormat::Csv => "csv",
            ContainerFormat::Excel => "excel",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named bundle of datasets plus cross-dataset rules
#[derive(Debug, Clone, PartialEq)]
pub struct PackageSpec {
    pub name: String,

    /// Member dataset names in declaration order
    pub datasets: Vec<String>,

    pub format: ContainerFormat,
    pub rules: Vec<ValidationRule>,
}
