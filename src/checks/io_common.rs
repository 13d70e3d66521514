use std::path::Path;

use snafu::prelude::*;

use crate::checks::{CheckResult, HeaderMismatchSnafu};

/// The responses of a survey export, as strings.
///
/// Every row has at least as many cells as there are headers.
#[derive(PartialEq, Debug, Clone)]
pub struct SurveyTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SurveyTable {
    pub fn new(headers: Vec<String>) -> SurveyTable {
        let mut headers = headers;
        // Excel adds a byte order mark when saving CSV files as UTF-8.
        if let Some(first) = headers.first_mut() {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_string();
            }
        }
        SurveyTable {
            headers,
            rows: Vec::new(),
        }
    }

    /// Adds a row, padding it with empty cells if it is too short.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        if row.len() < self.headers.len() {
            row.resize(self.headers.len(), String::new());
        }
        self.rows.push(row);
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// The index of the column with exactly this name (ignoring surrounding spaces).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name.trim())
    }

    /// The first column whose header contains all the fragments, ignoring case.
    pub fn find_column(&self, fragments: &[String]) -> Option<usize> {
        let fragments: Vec<String> = fragments.iter().map(|f| f.to_lowercase()).collect();
        self.headers.iter().position(|h| {
            let h = h.to_lowercase();
            fragments.iter().all(|f| h.contains(f.as_str()))
        })
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        (0..self.rows.len()).map(move |row| self.cell(row, col))
    }

    /// Appends the rows of another export of the same survey.
    pub fn append(&mut self, other: SurveyTable, path: &str) -> CheckResult<()> {
        ensure!(other.headers == self.headers, HeaderMismatchSnafu { path });
        self.rows.extend(other.rows);
        Ok(())
    }
}

/// Reads a rating, treating empty and non numeric cells as missing.
pub fn parse_rating(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SurveyTable {
        let mut t = SurveyTable::new(vec![
            "\u{feff}ID".to_string(),
            "SEGMENTO".to_string(),
            "La información suministrada es Clara y Fácil de entender".to_string(),
        ]);
        t.push_row(vec!["1".to_string(), "Personas".to_string(), "5".to_string()]);
        t.push_row(vec!["2".to_string()]);
        t
    }

    #[test]
    fn lookup_columns() {
        let t = table();
        assert_eq!(t.headers[0], "ID");
        assert_eq!(t.column_index("SEGMENTO"), Some(1));
        assert_eq!(t.column_index("segmento"), None);
        let fragments = vec![
            "información suministrada".to_string(),
            "clara y fácil".to_string(),
        ];
        assert_eq!(t.find_column(&fragments), Some(2));
        assert_eq!(t.find_column(&["lealtad".to_string()]), None);
    }

    #[test]
    fn short_rows_are_padded() {
        let t = table();
        assert_eq!(t.rows[1].len(), 3);
        let col: Vec<&str> = t.column(2).collect();
        assert_eq!(col, vec!["5", ""]);
        assert_eq!(t.cell(7, 0), "");
    }

    #[test]
    fn append_checks_headers() {
        let mut t = table();
        assert!(t.append(table(), "b.csv").is_ok());
        assert_eq!(t.num_rows(), 4);
        let other = SurveyTable::new(vec!["ID".to_string()]);
        assert!(t.append(other, "c.csv").is_err());
    }

    #[test]
    fn ratings() {
        assert_eq!(parse_rating(" 4 "), Some(4.0));
        assert_eq!(parse_rating("3.5"), Some(3.5));
        assert_eq!(parse_rating(""), None);
        assert_eq!(parse_rating("N/A"), None);
        assert_eq!(parse_rating("NaN"), None);
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/data/study/datos.csv"), "datos.csv");
    }
}
