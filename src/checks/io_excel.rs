use calamine::{open_workbook, DataType, Reader, Xlsx};
use chrono::{Duration, NaiveDate};
use log::debug;
use snafu::prelude::*;

use crate::checks::config_reader::{DataSource, DEFAULT_DATE_FORMAT};
use crate::checks::io_common::SurveyTable;
use crate::checks::{CheckResult, EmptyExcelSnafu, MissingWorksheetSnafu, OpeningExcelSnafu};

pub fn read_excel_table(path: &str, cfs: &DataSource) -> CheckResult<SurveyTable> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &cfs.excel_worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path })?,
    };

    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyExcelSnafu {})?;
    debug!("read_excel_table: header: {:?}", header);
    let mut table = SurveyTable::new(header.iter().map(read_cell).collect());
    for row in iter {
        table.push_row(row.iter().map(read_cell).collect());
    }
    Ok(table)
}

fn read_cell(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::DateTime(serial) => excel_serial_to_string(*serial).unwrap_or_default(),
        DataType::Empty | DataType::Error(_) => String::new(),
        #[allow(unreachable_patterns)]
        _ => String::new(),
    }
}

/// Converts an Excel date serial number (days since 1899-12-30) to the
/// default timestamp format, so that it can be read like a CSV export.
fn excel_serial_to_string(serial: f64) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let ts = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    Some(ts.format(DEFAULT_DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::Float(4.0)), "4");
        assert_eq!(read_cell(&DataType::Float(3.5)), "3.5");
        assert_eq!(read_cell(&DataType::Int(2)), "2");
        assert_eq!(read_cell(&DataType::Empty), "");
        assert_eq!(read_cell(&DataType::String("Personas".to_string())), "Personas");
    }

    #[test]
    fn date_serials() {
        assert_eq!(
            excel_serial_to_string(45397.5).unwrap(),
            "2024-04-15 12:00:00"
        );
        assert_eq!(excel_serial_to_string(1.0).unwrap(), "1899-12-31 00:00:00");
    }

    use crate::checks::CheckError;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::CompressionMethod;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Respuestas" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>ID</t></is></c><c r="B1" t="inlineStr"><is><t>SEGMENTO</t></is></c><c r="C1" t="inlineStr"><is><t>Satisfacción</t></is></c></row>
<row r="2"><c r="A2"><v>1</v></c><c r="B2" t="inlineStr"><is><t>Personas</t></is></c><c r="C2"><v>5</v></c></row>
<row r="3"><c r="A3"><v>2</v></c><c r="B3" t="inlineStr"><is><t>Empresas</t></is></c></row>
</sheetData>
</worksheet>"#;

    fn write_workbook(path: &std::path::Path) {
        let mut zw = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in [
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/worksheets/sheet1.xml", SHEET),
        ] {
            zw.start_file(name, options).unwrap();
            zw.write_all(contents.as_bytes()).unwrap();
        }
        zw.finish().unwrap();
    }

    fn source(path: &str, worksheet: Option<&str>) -> DataSource {
        DataSource {
            provider: "xlsx".to_string(),
            file_path: path.to_string(),
            delimiter: None,
            excel_worksheet_name: worksheet.map(|s| s.to_string()),
        }
    }

    #[test]
    fn read_workbook() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("export.xlsx");
        write_workbook(&path);
        let path = path.to_str().unwrap();

        for worksheet in [None, Some("Respuestas")] {
            let t = read_excel_table(path, &source(path, worksheet)).unwrap();
            assert_eq!(t.headers, vec!["ID", "SEGMENTO", "Satisfacción"]);
            assert_eq!(t.num_rows(), 2);
            assert_eq!(t.cell(0, 1), "Personas");
            assert_eq!(t.cell(0, 2), "5");
            assert_eq!(t.cell(1, 0), "2");
            assert_eq!(t.cell(1, 2), "");
        }

        assert!(matches!(
            read_excel_table(path, &source(path, Some("Hoja1"))),
            Err(CheckError::MissingWorksheet { .. })
        ));
    }

    #[test]
    fn missing_workbook() {
        let cfs = DataSource {
            provider: "xlsx".to_string(),
            file_path: "/nonexistent/export.xlsx".to_string(),
            delimiter: None,
            excel_worksheet_name: None,
        };
        assert!(read_excel_table(&cfs.file_path, &cfs).is_err());
    }
}
