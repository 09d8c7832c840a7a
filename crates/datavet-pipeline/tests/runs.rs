use anyhow::Result;
use datavet_pipeline::{Coordinator, EngineConfig, RunOutcome, RunRequest, RunStatus};
use datavet_report::{Category, Level, Report, ERROR_LOG, OUTPUT_LOG, REPORT_JSON, RESULTS_TXT};
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const SHOP_SCHEMA: &str = r#"
metadata: { name: shop, version: "1.2" }
datasets:
  clients:
    file_pattern: 'clients*.csv'
    fields:
      - { name: id, type: integer, required: true, unique: true }
      - { name: name, type: text, required: true, min_length: 2 }
      - { name: email, type: text, pattern: '[^@]+@[^@]+' }
    dataset_rules:
      - { name: has_clients, expression: 'count() > 0' }
  products:
    file_pattern: 'products*.csv'
    fields:
      - { name: sku, type: text, required: true, unique: true }
      - { name: price, type: decimal, min_value: 0 }
  orders:
    file_pattern: 'orders*.csv'
    fields:
      - { name: order_id, type: integer, unique: true }
      - { name: client_id, type: integer, required: true }
      - { name: sku, type: text }
      - { name: quantity, type: integer, min_value: 1 }
    row_rules:
      - { name: small_orders, expression: 'quantity <= 100', severity: warning }
packages:
  shop_export:
    datasets: [clients, products, orders]
    format: zip
    rules:
      - name: known_clients
        expression: 'isin(orders.client_id, clients.id)'
        description: 'Orders reference unknown clients'
"#;

const CLIENTS: &str = "id,name,email\n1,Alice,alice@example.com\n2,Bob,bob@example.com\n";
const PRODUCTS: &str = "sku,price\nAB-1,9.90\nAB-2,120\n";
const ORDERS: &str = "order_id,client_id,sku,quantity\n10,1,AB-1,2\n11,2,AB-2,1\n";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Result<Self> {
        Ok(Self { dir: TempDir::new()? })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    fn zip(&self, name: &str, entries: &[(&str, &str)]) -> Result<PathBuf> {
        let path = self.path(name);
        let mut zip = ZipWriter::new(fs::File::create(&path)?);
        for (entry, body) in entries {
            zip.start_file(*entry, SimpleFileOptions::default())?;
            zip.write_all(body.as_bytes())?;
        }
        zip.finish()?;
        Ok(path)
    }

    /// Minimal `.xlsx` with inline-string and numeric cells
    fn workbook(&self, name: &str, sheets: &[(&str, &[&[&str]])]) -> Result<PathBuf> {
        const MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
        const RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
        const DOC: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

        let mut workbook = format!(r#"<workbook xmlns="{MAIN}" xmlns:r="{DOC}"><sheets>"#);
        let mut rels = format!(r#"<Relationships xmlns="{RELS}">"#);
        for (i, (sheet, _)) in sheets.iter().enumerate() {
            let n = i + 1;
            write!(workbook, r#"<sheet name="{sheet}" sheetId="{n}" r:id="rId{n}"/>"#)?;
            write!(
                rels,
                r#"<Relationship Id="rId{n}" Type="{DOC}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            )?;
        }
        workbook.push_str("</sheets></workbook>");
        rels.push_str("</Relationships>");

        let path = self.path(name);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut zip = ZipWriter::new(fs::File::create(&path)?);
        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(workbook.as_bytes())?;
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(rels.as_bytes())?;
        for (i, (_, rows)) in sheets.iter().enumerate() {
            let mut xml = format!(r#"<worksheet xmlns="{MAIN}"><sheetData>"#);
            for (r, cells) in rows.iter().enumerate() {
                write!(xml, r#"<row r="{}">"#, r + 1)?;
                for (c, cell) in cells.iter().enumerate() {
                    let at = format!("{}{}", char::from(b'A' + u8::try_from(c)?), r + 1);
                    if cell.parse::<f64>().is_ok() {
                        write!(xml, r#"<c r="{at}"><v>{cell}</v></c>"#)?;
                    } else if !cell.is_empty() {
                        write!(xml, r#"<c r="{at}" t="inlineStr"><is><t>{cell}</t></is></c>"#)?;
                    }
                }
                xml.push_str("</row>");
            }
            xml.push_str("</sheetData></worksheet>");
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
            zip.write_all(xml.as_bytes())?;
        }
        zip.finish()?;
        Ok(path)
    }

    fn coordinator(&self) -> Coordinator {
        Coordinator::new(EngineConfig::default().with_work_root(self.path("executions")))
    }

    fn run(&self, schema: &Path, data: &Path, run_id: &str) -> Result<(RunOutcome, Report)> {
        let outcome = self
            .coordinator()
            .run(&RunRequest::new(schema, data).run_id(run_id))?;
        let report = read_report(&outcome.dir)?;
        Ok((outcome, report))
    }
}

fn read_report(dir: &Path) -> Result<Report> {
    Ok(serde_json::from_str(&fs::read_to_string(dir.join(REPORT_JSON))?)?)
}

fn assert_trio(dir: &Path) {
    for name in [OUTPUT_LOG, RESULTS_TXT, REPORT_JSON] {
        assert!(dir.join(name).is_file(), "{name} missing");
    }
}

#[test]
fn test_empty_dataset_is_clean() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file(
        "schema.yaml",
        "
metadata: { name: t }
datasets:
  items:
    file_pattern: 'items.csv'
    fields:
      - { name: id, type: integer, unique: true }
    row_rules:
      - { name: positive, expression: 'id > 0' }
",
    )?;
    let data = fx.file("items.csv", "id\n")?;

    let (outcome, report) = fx.run(&schema, &data, "empty")?;
    assert_eq!((outcome.run_id.as_str(), outcome.errors, outcome.warnings), ("empty", 0, 0));
    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.exit_code(), 0);
    assert_trio(&outcome.dir);
    assert!(outcome.dir.join("input.yaml").is_file());
    assert!(outcome.dir.join("data.csv").is_file());
    assert!(!outcome.dir.join(ERROR_LOG).exists());
    assert_eq!(report.totals.records, 0);
    assert!((report.totals.success_rate - 100.0).abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn test_clean_archive_package() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let data = fx.zip(
        "export.zip",
        &[("clients.csv", CLIENTS), ("products.csv", PRODUCTS), ("orders.csv", ORDERS)],
    )?;

    let (outcome, report) = fx.run(&schema, &data, "clean")?;
    assert_eq!(outcome.status, RunStatus::Success, "{:#?}", report.events);
    assert_eq!(outcome.errors, 0);
    assert_eq!(report.run.schema_name.as_deref(), Some("shop"));
    assert_eq!(report.run.schema_version.as_deref(), Some("1.2"));
    let datasets: Vec<&str> = report.datasets.iter().map(|d| d.dataset.as_str()).collect();
    assert_eq!(datasets, vec!["clients", "products", "orders"]);
    assert_eq!(report.totals.records, 6);
    Ok(())
}

#[test]
fn test_records_include_failing_rows() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let data = fx.file("products.csv", "sku,price\nAB-1,abc\nAB-2,-1\nAB-3,4\n")?;

    let (_, report) = fx.run(&schema, &data, "records")?;
    assert_eq!(report.datasets.len(), 1);
    assert_eq!(report.datasets[0].dataset, "products");
    assert_eq!(report.datasets[0].records, 3);
    assert_eq!(report.totals.records_with_errors, 2);
    Ok(())
}

#[test]
fn test_price_abc_fails_with_coercion_error() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let data = fx.file("products.csv", "sku,price\nAB-1,9.90\nAB-2,abc\n")?;

    let (outcome, report) = fx.run(&schema, &data, "price")?;
    assert!(outcome.errors >= 1);
    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.exit_code(), 1);

    let coercion: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.category == Category::Coercion)
        .collect();
    assert_eq!(coercion.len(), 1);
    assert!(coercion[0].message.contains("price"));
    assert_eq!(coercion[0].line, Some(3));
    assert_eq!(coercion[0].value.as_deref(), Some("abc"));
    Ok(())
}

#[test]
fn test_two_identical_unique_values_give_one_error() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let data = fx.file("clients.csv", "id,name,email\n7,Alice,a@x.org\n7,Bob,b@x.org\n8,Carol,c@x.org\n")?;

    let (outcome, report) = fx.run(&schema, &data, "unique")?;
    let unique: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.category == Category::Unique)
        .collect();
    assert_eq!(unique.len(), 1);
    assert_eq!(unique[0].line, Some(3));
    assert_eq!(outcome.errors, 1);
    Ok(())
}

#[test]
fn test_dangling_key_is_one_package_error() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let orders = "order_id,client_id,sku,quantity\n10,1,AB-1,2\n11,9,AB-2,500\n";
    let data = fx.zip(
        "export.zip",
        &[("clients.csv", CLIENTS), ("products.csv", PRODUCTS), ("orders.csv", orders)],
    )?;

    let (outcome, report) = fx.run(&schema, &data, "dangling")?;
    let package: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.category == Category::PackageRule)
        .collect();
    assert_eq!(package.len(), 1);
    assert_eq!(package[0].level, Level::Error);
    assert_eq!(package[0].rule.as_deref(), Some("known_clients"));
    assert_eq!(package[0].file.as_deref(), Some("orders.csv"));

    // The orders' own row rule still ran
    assert!(report
        .events
        .iter()
        .any(|e| e.category == Category::RowRule && e.rule.as_deref() == Some("small_orders")));
    assert_eq!(outcome.errors, 1);
    assert_eq!(outcome.warnings, 1);
    assert_eq!(outcome.status, RunStatus::Failed);
    Ok(())
}

#[test]
fn test_archive_missing_member() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let clients = "id,name,email\n1,Alice,alice@example.com\n2,B,bob@example.com\n";
    let data = fx.zip(
        "export.zip",
        &[("data/clients.csv", clients), ("data/orders.csv", ORDERS), ("README.txt", "hi")],
    )?;

    let (outcome, report) = fx.run(&schema, &data, "missing")?;
    assert_eq!(report.missing_files.len(), 1);
    assert!(report.missing_files[0].message.contains("products"));

    let clients_stats = report
        .datasets
        .iter()
        .find(|d| d.dataset == "clients")
        .expect("clients validated");
    assert_eq!(clients_stats.records, 2);
    assert_eq!(clients_stats.source, "data/clients.csv");
    // min_length violation on line 3 of clients.csv
    assert!(report.events.iter().any(|e| e.category == Category::FieldRule
        && e.file.as_deref() == Some("data/clients.csv")
        && e.line == Some(3)));
    assert_eq!(outcome.status, RunStatus::Failed);
    Ok(())
}

#[test]
fn test_headerless_short_row_is_format_error() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file(
        "schema.yaml",
        "
metadata: { name: readings }
datasets:
  readings:
    file_pattern: '*.csv'
    file_format: { type: csv, header: false }
    fields:
      - { name: station, type: text }
      - { name: day, type: date }
      - { name: low, type: decimal }
      - { name: high, type: decimal }
      - { name: unit, type: text }
    row_rules:
      - { name: ordered, expression: 'low <= high' }
",
    )?;
    let data = fx.file(
        "readings.csv",
        "S1,2024-01-01,1.5,4.0,C\nS1,2024-01-02,2.0,3.0\nS2,2024-01-01,0.5,2.5,C\n",
    )?;

    let (outcome, report) = fx.run(&schema, &data, "headerless")?;
    assert_eq!(report.format_errors.len(), 1);
    assert_eq!(report.format_errors[0].line, Some(2));
    assert_eq!(report.datasets[0].records, 3);
    assert!(!report.events.iter().any(|e| e.category == Category::RowRule));
    assert_eq!(outcome.errors, 1);
    Ok(())
}

const BUDGET_SCHEMA: &str = "
metadata: { name: budget }
datasets:
  summary:
    file_pattern: 'budget*.xlsx'
    file_format: { sheet: Summary }
    fields:
      - { name: line, type: text, required: true }
      - { name: amount, type: decimal, min_value: 0 }
    dataset_rules:
      - { name: has_lines, expression: 'count() > 0' }
  notes:
    file_pattern: 'budget*.xlsx'
    file_format: { sheet: Notes }
    fields:
      - { name: note, type: text }
packages:
  budget:
    datasets: [summary, notes]
    format: excel
";

#[test]
fn test_clean_workbook_package() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("budget.yaml", BUDGET_SCHEMA)?;
    let data = fx.workbook(
        "budget_2024.xlsx",
        &[
            ("Summary", &[&["line", "amount"], &["rent", "1200"], &["food", "310.5"]]),
            ("Notes", &[&["note"], &["draft"]]),
        ],
    )?;

    let (outcome, report) = fx.run(&schema, &data, "workbook")?;
    assert_eq!(outcome.status, RunStatus::Success, "{:#?}", report.events);
    assert!(outcome.dir.join("data.xlsx").is_file());
    let datasets: Vec<&str> = report.datasets.iter().map(|d| d.dataset.as_str()).collect();
    assert_eq!(datasets, vec!["summary", "notes"]);
    assert_eq!(report.totals.records, 3);
    assert!(report.missing_files.is_empty());
    Ok(())
}

#[test]
fn test_workbook_without_declared_sheet() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("budget.yaml", BUDGET_SCHEMA)?;
    let data = fx.workbook(
        "budget_2024.xlsx",
        &[("Summary", &[&["line", "amount"], &["rent", "-5"]])],
    )?;

    let (outcome, report) = fx.run(&schema, &data, "no-notes")?;
    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(report.missing_files.len(), 1);
    assert!(report.missing_files[0].message.contains("'notes'"));
    assert!(report.missing_files[0]
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("Notes")));

    let summary = report
        .datasets
        .iter()
        .find(|d| d.dataset == "summary")
        .expect("summary validated");
    assert_eq!(summary.records, 1);
    assert!(report.events.iter().any(|e| e.category == Category::FieldRule
        && e.value.as_deref() == Some("-5")
        && e.line == Some(2)));
    Ok(())
}

#[test]
fn test_invalid_schema_is_critical() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file(
        "broken.yaml",
        "
metadata: { name: t }
datasets:
  d:
    fields:
      - { name: n, type: money }
",
    )?;
    let data = fx.file("d.csv", "n\n1\n")?;

    let (outcome, report) = fx.run(&schema, &data, "broken")?;
    assert_eq!(outcome.status, RunStatus::Critical);
    assert_eq!(outcome.exit_code(), 2);
    assert_trio(&outcome.dir);
    let error_log = fs::read_to_string(outcome.dir.join(ERROR_LOG))?;
    assert!(error_log.contains("run broken aborted"));
    assert!(report.events.iter().any(|e| e.category == Category::Critical));
    Ok(())
}

#[test]
fn test_unsupported_input_is_critical() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let data = fx.file("book.xlsx", "not really a workbook")?;

    let (outcome, _) = fx.run(&schema, &data, "nospec")?;
    assert_eq!(outcome.status, RunStatus::Critical);
    let error_log = fs::read_to_string(outcome.dir.join(ERROR_LOG))?;
    assert!(error_log.contains("No package or dataset"));
    Ok(())
}

#[test]
fn test_same_run_id_twice_is_reproducible() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let orders = "order_id,client_id,sku,quantity\n10,1,AB-1,0\n10,3,AB-2,1\n";
    let data = fx.zip(
        "export.zip",
        &[("clients.csv", CLIENTS), ("products.csv", PRODUCTS), ("orders.csv", orders)],
    )?;

    let (first, first_report) = fx.run(&schema, &data, "again")?;
    let first_text = fs::read_to_string(first.dir.join(RESULTS_TXT))?;
    fs::write(first.dir.join(ERROR_LOG), "stale")?;

    let (second, second_report) = fx.run(&schema, &data, "again")?;
    let second_text = fs::read_to_string(second.dir.join(RESULTS_TXT))?;

    assert_eq!(first, second);
    assert_eq!(normalize_report(first_report), normalize_report(second_report));
    assert_eq!(normalize_text(&first_text), normalize_text(&second_text));
    assert!(!second.dir.join(ERROR_LOG).exists());
    Ok(())
}

#[test]
fn test_replay_from_run_directory_copies() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let data = fx.zip(
        "export.zip",
        &[("clients.csv", CLIENTS), ("products.csv", PRODUCTS), ("orders.csv", ORDERS)],
    )?;

    let (first, _) = fx.run(&schema, &data, "replay")?;
    assert_eq!(first.status, RunStatus::Success);

    let (second, report) = fx.run(&first.dir.join("input.yaml"), &first.dir.join("data.zip"), "replay")?;
    assert_eq!(second.status, RunStatus::Success, "{:#?}", report.events);
    assert_eq!(second.dir, first.dir);
    assert!(!second.dir.join(ERROR_LOG).exists());
    assert_eq!(report.datasets.len(), 3);
    assert_eq!(report.totals.records, 6);
    assert_eq!(fs::read_to_string(second.dir.join("input.yaml"))?, SHOP_SCHEMA);
    Ok(())
}

#[test]
fn test_output_log_entries_are_in_report_json() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let data = fx.file("orders.csv", "order_id,client_id,sku,quantity\n1,x,AB-1,2\n2,3,<b>,0\n")?;

    let (outcome, report) = fx.run(&schema, &data, "projection")?;
    let html = fs::read_to_string(outcome.dir.join(OUTPUT_LOG))?;
    let items: Vec<&str> = html.lines().filter(|l| l.starts_with("<li ")).collect();
    assert_eq!(items.len(), report.events.len());

    for item in items {
        let seq: u64 = attribute(item, "data-seq").expect("seq").parse()?;
        let event = report.events.iter().find(|e| e.seq == seq).expect("event");
        assert_eq!(attribute(item, "data-level").as_deref(), Some(event.level.as_str()));
        assert_eq!(attribute(item, "data-file"), event.file.as_deref().map(datavet_report::html::escape));
        assert_eq!(attribute(item, "data-line"), event.line.map(|l| l.to_string()));
        assert!(item.contains(&datavet_report::html::escape(&event.message)));
    }
    Ok(())
}

#[test]
fn test_box_and_sender_are_reported() -> Result<()> {
    let fx = Fixture::new()?;
    let schema = fx.file("shop.yaml", SHOP_SCHEMA)?;
    let data = fx.file("clients.csv", CLIENTS)?;

    let outcome = fx.coordinator().run(
        &RunRequest::new(&schema, &data)
            .box_id("box-7")
            .sender_id("acme")
            .channel("sftp"),
    )?;
    let report = read_report(&outcome.dir)?;
    assert_eq!(report.run.run_id, outcome.run_id);
    assert_eq!(report.run.box_id.as_deref(), Some("box-7"));
    assert_eq!(report.run.sender_id.as_deref(), Some("acme"));
    assert_eq!(report.run.channel.as_deref(), Some("sftp"));
    assert!(fs::read_to_string(outcome.dir.join(RESULTS_TXT))?.contains("acme"));
    Ok(())
}

fn attribute(line: &str, name: &str) -> Option<String> {
    let marker = format!(" {name}=\"");
    let start = line.find(&marker)? + marker.len();
    let end = line[start..].find('"')? + start;
    Some(line[start..end].to_string())
}

fn normalize_report(mut report: Report) -> Report {
    report.run.started_at = chrono_epoch();
    report.run.finished_at = None;
    report.duration_ms = 0;
    for stats in &mut report.datasets {
        stats.duration_ms = 0;
    }
    for entries in [
        &mut report.events,
        &mut report.format_errors,
        &mut report.missing_files,
        &mut report.skipped_rules,
        &mut report.rule_faults,
    ] {
        for entry in entries.iter_mut() {
            entry.timestamp = chrono_epoch();
        }
    }
    report
}

fn chrono_epoch() -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::<chrono::Utc>::UNIX_EPOCH
}

fn normalize_text(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| !l.starts_with("Started:") && !l.starts_with("Finished:") && !l.starts_with("Duration:"))
        .map(|l| match l.rfind(" warning(s), ") {
            Some(at) => l[..at].to_string(),
            None => l.to_string(),
        })
        .collect()
}
