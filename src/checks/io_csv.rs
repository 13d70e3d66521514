// Primitives for reading delimited survey exports.

use std::io::Read;

use log::debug;
use snafu::prelude::*;

use crate::checks::config_reader::DataSource;
use crate::checks::io_common::SurveyTable;
use crate::checks::{CheckResult, CsvLineParseSnafu, OpeningCsvSnafu};

pub fn csv_reader_builder(delimiter: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.delimiter(delimiter).has_headers(true).flexible(true);
    builder
}

pub fn read_csv_table(path: &str, cfs: &DataSource) -> CheckResult<SurveyTable> {
    let delimiter = cfs.delimiter_byte()?;
    let rdr = csv_reader_builder(delimiter)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    parse_csv_table(rdr)
}

pub fn parse_csv_table<R: Read>(mut rdr: csv::Reader<R>) -> CheckResult<SurveyTable> {
    let headers: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1_usize })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    debug!("parse_csv_table: headers: {:?}", headers);
    let mut table = SurveyTable::new(headers);

    for (idx, line_r) in rdr.records().enumerate() {
        // The header is on the first line
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        table.push_row(line.iter().map(|s| s.to_string()).collect());
    }
    Ok(table)
}
