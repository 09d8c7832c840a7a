//! Schema loader
//!
//! Documents are deserialized into loosely typed file structs first, then
//! converted into the model while every structural problem is collected, so
//! that one load reports all mistakes in a schema at once.

use crate::model::{
    ContainerFormat, CsvFormat, DatasetSpec, ExcelFormat, FieldSpec, FieldType, FileFormat,
    Metadata, PackageSpec, SchemaDocument, Severity, TextEncoding, ValidationRule,
};
use crate::pattern;
use crate::{Error, Result};
use datavet_expr::{parse, Expr};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use tracing::{debug, trace};

/// Mapping that keeps document order and rejects duplicate keys
#[derive(Debug)]
struct OrderedMap<T>(Vec<(String, T)>);

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = OrderedMap<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of names to definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, T)> = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(de::Error::custom(format!("duplicate entry '{key}'")));
                    }
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// A scalar written as text, number or boolean
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => format!("{f:?}"),
            Scalar::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    metadata: Option<MetadataFile>,
    #[serde(default)]
    datasets: Option<OrderedMap<DatasetFile>>,
    #[serde(default)]
    packages: OrderedMap<PackageFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetadataFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<Scalar>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatasetFile {
    #[serde(default)]
    file_pattern: Option<String>,
    #[serde(default)]
    file_format: Option<FormatFile>,
    #[serde(default)]
    fields: Vec<FieldFile>,
    #[serde(default)]
    row_rules: Vec<RuleEntry>,
    #[serde(default)]
    dataset_rules: Vec<RuleEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FormatFile {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    delimiter: Option<String>,
    #[serde(default)]
    quote: Option<String>,
    #[serde(default)]
    header: Option<bool>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    trim: Option<bool>,
    #[serde(default)]
    sheet: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldFile {
    name: String,
    #[serde(rename = "type", default)]
    field_type: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    default: Option<Scalar>,
    #[serde(default)]
    options: Vec<Scalar>,
    #[serde(default)]
    formats: Vec<String>,
    #[serde(default)]
    min_length: Option<usize>,
    #[serde(default)]
    max_length: Option<usize>,
    #[serde(default)]
    min_value: Option<f64>,
    #[serde(default)]
    max_value: Option<f64>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    rules: Vec<RuleEntry>,
}

/// A rule, either in full form or as a bare expression
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleEntry {
    Expression(String),
    Full(RuleFile),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    severity: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageFile {
    #[serde(default)]
    datasets: Vec<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    rules: Vec<RuleEntry>,
}

/// Where a rule is attached, which decides how it may reference columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleContext<'a> {
    Field,
    Row,
    Dataset,
    Package(&'a [String]),
}

/// Accumulates problems found while converting a document
#[derive(Debug, Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }
}

/// Load a schema from a file, choosing JSON or YAML by extension
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read, [`Error::InvalidFormat`]
/// for unparseable documents and [`Error::Validation`] for structural problems.
pub fn load_from_file(path: &Path) -> Result<SchemaDocument> {
    trace!("Loading schema from file: {:?}", path);
    let content = std::fs::read_to_string(path)?;

    if path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
    {
        load_json(&content)
    } else {
        load_yaml(&content)
    }
}

/// Load a schema from YAML text (JSON documents are valid YAML)
///
/// # Errors
///
/// See [`load_from_file`].
pub fn load(text: &str) -> Result<SchemaDocument> {
    load_yaml(text)
}

/// Load a schema from a YAML string
///
/// # Errors
///
/// See [`load_from_file`].
pub fn load_yaml(yaml: &str) -> Result<SchemaDocument> {
    let file: SchemaFile = serde_yaml::from_str(yaml)
        .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))?;
    convert_schema_file(file)
}

/// Load a schema from a JSON string
///
/// # Errors
///
/// See [`load_from_file`].
pub fn load_json(json: &str) -> Result<SchemaDocument> {
    let file: SchemaFile = serde_json::from_str(json)
        .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;
    convert_schema_file(file)
}

fn convert_schema_file(file: SchemaFile) -> Result<SchemaDocument> {
    let mut problems = Problems::default();

    let metadata = match file.metadata {
        Some(metadata) => convert_metadata(metadata, &mut problems),
        None => {
            problems.push("missing required section 'metadata'");
            Metadata::default()
        }
    };

    let datasets = match file.datasets {
        Some(OrderedMap(entries)) if entries.is_empty() => {
            problems.push("section 'datasets' declares no dataset");
            Vec::new()
        }
        Some(OrderedMap(entries)) => entries
            .into_iter()
            .map(|(name, dataset)| convert_dataset(name, dataset, &mut problems))
            .collect(),
        None => {
            problems.push("missing required section 'datasets'");
            Vec::new()
        }
    };

    let packages: Vec<PackageSpec> = file
        .packages
        .0
        .into_iter()
        .map(|(name, package)| convert_package(name, package, &datasets, &mut problems))
        .collect();

    if !problems.0.is_empty() {
        debug!("Schema rejected with {} problem(s)", problems.0.len());
        return Err(Error::Validation(problems.0));
    }

    debug!(
        "Loaded schema '{}' with {} dataset(s) and {} package(s)",
        metadata.name,
        datasets.len(),
        packages.len()
    );
    Ok(SchemaDocument {
        metadata,
        datasets,
        packages,
    })
}

fn convert_metadata(file: MetadataFile, problems: &mut Problems) -> Metadata {
    let name = file.name.unwrap_or_default();
    if name.trim().is_empty() {
        problems.push("metadata: 'name' is required");
    }
    Metadata {
        name,
        version: file.version.map(Scalar::into_text).unwrap_or_default(),
        author: file.author,
        description: file.description,
    }
}

fn convert_dataset(name: String, file: DatasetFile, problems: &mut Problems) -> DatasetSpec {
    let context = format!("dataset '{name}'");
    let format = convert_format(&context, file.file_format, file.file_pattern.as_deref(), problems);

    let file_pattern = file.file_pattern.unwrap_or_else(|| format!("{name}.*"));
    if let Err(message) = pattern::validate(&file_pattern) {
        problems.push(format!("{context}: invalid file_pattern '{file_pattern}': {message}"));
    }

    if file.fields.is_empty() {
        problems.push(format!("{context}: declares no fields"));
    }
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(file.fields.len());
    for field in file.fields {
        if !seen.insert(field.name.clone()) {
            problems.push(format!("{context}: duplicate field '{}'", field.name));
        }
        fields.push(convert_field(&context, field, problems));
    }

    let row_rules = convert_rules(&context, "row_rules", file.row_rules, RuleContext::Row, problems);
    let dataset_rules = convert_rules(
        &context,
        "dataset_rules",
        file.dataset_rules,
        RuleContext::Dataset,
        problems,
    );

    DatasetSpec {
        name,
        file_pattern,
        format,
        fields,
        row_rules,
        dataset_rules,
    }
}

fn single_byte(context: &str, key: &str, value: Option<String>, default: u8, problems: &mut Problems) -> u8 {
    let Some(value) = value else {
        return default;
    };
    let value = if value == "\\t" { "\t".to_string() } else { value };
    match value.as_bytes() {
        [byte] => *byte,
        _ => {
            problems.push(format!(
                "{context}: {key} must be a single ASCII character, got '{value}'"
            ));
            default
        }
    }
}

fn convert_format(
    context: &str,
    file: Option<FormatFile>,
    file_pattern: Option<&str>,
    problems: &mut Problems,
) -> FileFormat {
    let file = file.unwrap_or_default();
    let kind = file.kind.clone().unwrap_or_else(|| {
        let spreadsheet = file_pattern.is_some_and(|p| {
            let p = p.to_ascii_lowercase();
            [".xlsx", ".xlsm", ".xlsb", ".xls", ".ods"]
                .iter()
                .any(|ext| p.ends_with(ext))
        });
        let kind = if spreadsheet { "excel" } else { "csv" };
        kind.to_string()
    });

    match kind.to_ascii_lowercase().as_str() {
        "csv" => {
            let defaults = CsvFormat::default();
            let encoding = match file.encoding.as_deref().map(str::to_ascii_lowercase).as_deref() {
                None | Some("utf-8" | "utf8") => TextEncoding::Utf8,
                Some("latin-1" | "latin1" | "iso-8859-1") => TextEncoding::Latin1,
                Some(other) => {
                    problems.push(format!("{context}: unsupported encoding '{other}'"));
                    TextEncoding::Utf8
                }
            };
            if file.sheet.is_some() {
                problems.push(format!("{context}: 'sheet' only applies to excel files"));
            }
            FileFormat::Csv(CsvFormat {
                delimiter: single_byte(context, "delimiter", file.delimiter, defaults.delimiter, problems),
                quote: single_byte(context, "quote", file.quote, defaults.quote, problems),
                header: file.header.unwrap_or(defaults.header),
                encoding,
                trim: file.trim.unwrap_or(defaults.trim),
            })
        }
        "excel" | "xlsx" => {
            if file.delimiter.is_some() || file.quote.is_some() || file.encoding.is_some() {
                problems.push(format!(
                    "{context}: delimiter, quote and encoding only apply to csv files"
                ));
            }
            FileFormat::Excel(ExcelFormat {
                sheet: file.sheet,
                header: file.header.unwrap_or(true),
            })
        }
        other => {
            problems.push(format!(
                "{context}: unknown file_format type '{other}' (expected csv or excel)"
            ));
            FileFormat::Csv(CsvFormat::default())
        }
    }
}

fn convert_field(dataset: &str, file: FieldFile, problems: &mut Problems) -> FieldSpec {
    let context = format!("{dataset}, field '{}'", file.name);

    let field_type = match file.field_type.as_deref() {
        None => FieldType::Text,
        Some(name) => FieldType::from_name(name).unwrap_or_else(|| {
            problems.push(format!(
                "{context}: unknown type '{name}' (expected text, decimal, integer, date, boolean or enum)"
            ));
            FieldType::Text
        }),
    };

    let options: Vec<String> = file.options.into_iter().map(Scalar::into_text).collect();
    if field_type == FieldType::Enum && options.is_empty() {
        problems.push(format!("{context}: enum fields must declare at least one option"));
    }
    if file.formats.iter().any(|f| f.trim().is_empty()) {
        problems.push(format!("{context}: date formats must not be empty"));
    }
    if let Some(pattern) = &file.pattern {
        if let Err(e) = regex::Regex::new(pattern) {
            problems.push(format!("{context}: invalid pattern '{pattern}': {e}"));
        }
    }
    if let (Some(min), Some(max)) = (file.min_length, file.max_length) {
        if min > max {
            problems.push(format!("{context}: min_length {min} exceeds max_length {max}"));
        }
    }
    if let (Some(min), Some(max)) = (file.min_value, file.max_value) {
        if min > max {
            problems.push(format!("{context}: min_value {min} exceeds max_value {max}"));
        }
    }

    let rules = convert_rules(&context, "rules", file.rules, RuleContext::Field, problems);

    FieldSpec {
        name: file.name,
        field_type,
        required: file.required,
        unique: file.unique,
        default: file.default.map(Scalar::into_text),
        options,
        formats: file.formats,
        min_length: file.min_length,
        max_length: file.max_length,
        min_value: file.min_value,
        max_value: file.max_value,
        pattern: file.pattern,
        rules,
    }
}

fn convert_rules(
    owner: &str,
    section: &str,
    entries: Vec<RuleEntry>,
    scope: RuleContext<'_>,
    problems: &mut Problems,
) -> Vec<ValidationRule> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let context = format!("{owner}, {section}[{index}]");
            convert_rule(&context, index, entry, scope, problems)
        })
        .collect()
}

fn convert_rule(
    context: &str,
    index: usize,
    entry: RuleEntry,
    scope: RuleContext<'_>,
    problems: &mut Problems,
) -> Option<ValidationRule> {
    let file = match entry {
        RuleEntry::Expression(expression) => RuleFile {
            name: None,
            description: None,
            expression: Some(expression),
            severity: None,
        },
        RuleEntry::Full(file) => file,
    };

    let expression = file.expression.unwrap_or_default();
    if expression.trim().is_empty() {
        problems.push(format!("{context}: rule has no expression"));
        return None;
    }
    let severity = match file.severity.as_deref() {
        None => Severity::Error,
        Some(name) => Severity::from_name(name).unwrap_or_else(|| {
            problems.push(format!(
                "{context}: invalid severity '{name}' (expected error or warning)"
            ));
            Severity::Error
        }),
    };

    let expr = match parse(&expression) {
        Ok(expr) => expr,
        Err(e) => {
            problems.push(format!("{context}: {e} in '{expression}'"));
            return None;
        }
    };
    check_references(context, &expr, scope, problems);

    let name = file.name.unwrap_or_else(|| format!("rule_{}", index + 1));
    let description = file
        .description
        .unwrap_or_else(|| format!("Rule '{name}' failed: {expression}"));
    Some(ValidationRule {
        name,
        description,
        expression,
        severity,
        expr,
    })
}

fn check_references(context: &str, expr: &Expr, scope: RuleContext<'_>, problems: &mut Problems) {
    for column in expr.references() {
        match (scope, &column.dataset) {
            (RuleContext::Package(members), Some(dataset)) => {
                if !members.contains(dataset) {
                    problems.push(format!(
                        "{context}: '{column}' references '{dataset}', which is not a member of the package"
                    ));
                }
            }
            (RuleContext::Package(_), None) => problems.push(format!(
                "{context}: package rules must qualify columns as dataset.column, found '{column}'"
            )),
            (_, Some(_)) => problems.push(format!(
                "{context}: qualified reference '{column}' is only allowed in package rules"
            )),
            (_, None) => {}
        }
    }
}

fn convert_package(
    name: String,
    file: PackageFile,
    datasets: &[DatasetSpec],
    problems: &mut Problems,
) -> PackageSpec {
    let context = format!("package '{name}'");

    let format = match file.format.as_deref() {
        None => ContainerFormat::Zip,
        Some(value) => ContainerFormat::from_name(value).unwrap_or_else(|| {
            problems.push(format!(
                "{context}: unknown format '{value}' (expected zip, csv or excel)"
            ));
            ContainerFormat::Zip
        }),
    };

    if file.datasets.is_empty() {
        problems.push(format!("{context}: declares no datasets"));
    }
    let mut seen = HashSet::new();
    let mut members: Vec<&DatasetSpec> = Vec::new();
    for member in &file.datasets {
        if !seen.insert(member.as_str()) {
            problems.push(format!("{context}: dataset '{member}' listed twice"));
            continue;
        }
        match datasets.iter().find(|d| &d.name == member) {
            Some(dataset) => members.push(dataset),
            None => problems.push(format!("{context}: references unknown dataset '{member}'")),
        }
    }

    // Only archive entries are routed by pattern; a workbook feeds every member.
    let routed = if format == ContainerFormat::Zip { members.as_slice() } else { &[] };
    for (i, a) in routed.iter().enumerate() {
        for b in &routed[i + 1..] {
            if pattern::may_overlap(&a.file_pattern, &b.file_pattern) {
                problems.push(format!(
                    "{context}: ambiguous file patterns, '{}' ({}) and '{}' ({}) can match the same file",
                    a.name, a.file_pattern, b.name, b.file_pattern
                ));
            }
        }
    }

    let rules = convert_rules(
        &context,
        "rules",
        file.rules,
        RuleContext::Package(&file.datasets),
        problems,
    );

    PackageSpec {
        name,
        datasets: file.datasets,
        format,
        rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r"
metadata:
  name: minimal
  version: 1.0
datasets:
  clients:
    file_pattern: clients*.csv
    fields:
      - name: id
        type: integer
        required: true
        unique: true
      - name: name
";

    fn problems_of(yaml: &str) -> Vec<String> {
        match load_yaml(yaml) {
            Err(Error::Validation(problems)) => problems,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_minimal_schema() {
        let schema = load_yaml(MINIMAL).unwrap();
        assert_eq!(schema.metadata.name, "minimal");
        assert_eq!(schema.metadata.version, "1.0");
        let clients = schema.dataset("clients").unwrap();
        assert_eq!(clients.field_names(), vec!["id", "name"]);
        assert_eq!(clients.fields[1].field_type, FieldType::Text);
        assert_eq!(clients.format, FileFormat::Csv(CsvFormat::default()));
        assert!(clients.matches("Clients_2024.CSV"));
    }

    #[test]
    fn test_datasets_keep_declaration_order() {
        let yaml = r"
metadata: { name: ordered }
datasets:
  zeta: { fields: [ { name: a } ] }
  alpha: { fields: [ { name: a } ] }
  mid: { fields: [ { name: a } ] }
";
        let schema = load_yaml(yaml).unwrap();
        let names: Vec<&str> = schema.datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(schema.datasets[0].file_pattern, "zeta.*");
    }

    #[test]
    fn test_missing_sections_reported_together() {
        let problems = problems_of("packages: {}\n");
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("'metadata'"));
        assert!(problems[1].contains("'datasets'"));
    }

    #[test]
    fn test_collects_every_problem() {
        let yaml = r"
metadata: { name: broken }
datasets:
  orders:
    fields:
      - { name: id, type: uuid }
      - { name: id }
      - { name: status, type: enum }
      - { name: code, pattern: '([a-z' }
    row_rules:
      - { expression: 'amount >', severity: error }
      - { expression: 'amount > 0', severity: fatal }
  empty:
    fields: []
";
        let problems = problems_of(yaml);
        let joined = problems.join("\n");
        assert!(joined.contains("unknown type 'uuid'"));
        assert!(joined.contains("duplicate field 'id'"));
        assert!(joined.contains("at least one option"));
        assert!(joined.contains("invalid pattern"));
        assert!(joined.contains("Syntax error"));
        assert!(joined.contains("invalid severity 'fatal'"));
        assert!(joined.contains("dataset 'empty': declares no fields"));
        assert_eq!(problems.len(), 7);
    }

    #[test]
    fn test_severity_is_case_sensitive() {
        let yaml = r"
metadata: { name: s }
datasets:
  d:
    fields: [ { name: a } ]
    row_rules: [ { expression: 'a is not null', severity: Warning } ]
";
        assert!(problems_of(yaml)[0].contains("invalid severity 'Warning'"));
    }

    #[test]
    fn test_package_checks() {
        let yaml = r"
metadata: { name: p }
datasets:
  orders: { file_pattern: '*.csv', fields: [ { name: id } ] }
  clients: { file_pattern: 'clients.csv', fields: [ { name: id } ] }
packages:
  bundle:
    datasets: [orders, clients, ghosts]
    format: tarball
    rules:
      - isin(orders.id, products.id)
      - id > 0
";
        let joined = problems_of(yaml).join("\n");
        assert!(joined.contains("unknown format 'tarball'"));
        assert!(joined.contains("unknown dataset 'ghosts'"));
        assert!(joined.contains("ambiguous file patterns"));
        assert!(joined.contains("'products.id' references 'products'"));
        assert!(joined.contains("must qualify columns"));
    }

    #[test]
    fn test_workbook_members_may_share_pattern() {
        let yaml = r"
metadata: { name: book }
datasets:
  a: { file_pattern: 'book*.xlsx', file_format: { sheet: A }, fields: [ { name: id } ] }
  b: { file_pattern: 'book*.xlsx', file_format: { sheet: B }, fields: [ { name: id } ] }
packages:
  workbook: { datasets: [a, b], format: excel }
  archive: { datasets: [a, b], format: zip }
";
        let problems = problems_of(yaml);
        assert_eq!(problems.len(), 1, "{problems:?}");
        assert!(problems[0].starts_with("package 'archive': ambiguous file patterns"));
    }

    #[test]
    fn test_qualified_reference_outside_package() {
        let yaml = r"
metadata: { name: q }
datasets:
  orders:
    fields: [ { name: id } ]
    dataset_rules: [ 'count(orders.id) > 0' ]
";
        assert!(problems_of(yaml)[0].contains("only allowed in package rules"));
    }

    #[test]
    fn test_rule_shorthand_and_defaults() {
        let yaml = r"
metadata: { name: r }
datasets:
  orders:
    fields:
      - name: amount
        type: decimal
        rules: [ 'value >= 0' ]
";
        let schema = load_yaml(yaml).unwrap();
        let rule = &schema.datasets[0].fields[0].rules[0];
        assert_eq!(rule.name, "rule_1");
        assert_eq!(rule.severity, Severity::Error);
        assert_eq!(rule.description, "Rule 'rule_1' failed: value >= 0");
    }

    #[test]
    fn test_excel_format_inferred_from_pattern() {
        let yaml = r"
metadata: { name: x }
datasets:
  budget:
    file_pattern: budget*.xlsx
    file_format: { sheet: Summary }
    fields: [ { name: line } ]
";
        let schema = load_yaml(yaml).unwrap();
        assert_eq!(
            schema.datasets[0].format,
            FileFormat::Excel(ExcelFormat {
                sheet: Some("Summary".into()),
                header: true
            })
        );
    }

    #[test]
    fn test_csv_options() {
        let yaml = r"
metadata: { name: c }
datasets:
  legacy:
    file_format: { type: csv, delimiter: ';', header: false, encoding: latin-1, trim: true }
    fields: [ { name: a }, { name: b } ]
";
        let schema = load_yaml(yaml).unwrap();
        let FileFormat::Csv(csv) = &schema.datasets[0].format else {
            panic!("expected csv format");
        };
        assert_eq!(csv.delimiter, b';');
        assert!(!csv.header);
        assert!(csv.trim);
        assert_eq!(csv.encoding, TextEncoding::Latin1);
    }

    #[test]
    fn test_load_json() {
        let json = r#"{
            "metadata": {"name": "j", "version": "2"},
            "datasets": {"d": {"fields": [{"name": "flag", "type": "boolean", "default": false}]}}
        }"#;
        let schema = load_json(json).unwrap();
        assert_eq!(schema.datasets[0].fields[0].default.as_deref(), Some("false"));
    }

    #[test]
    fn test_invalid_yaml_is_format_error() {
        assert!(matches!(load_yaml("metadata: ["), Err(Error::InvalidFormat(_))));
        assert!(matches!(
            load_yaml("metadata: { name: a, colour: red }\ndatasets: {}\n"),
            Err(Error::InvalidFormat(_))
        ));
    }
}
