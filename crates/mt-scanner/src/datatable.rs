//! Reader for the CSV data tables OpenRewrite exports during a run.
//!
//! Each search recipe emits rows tagged with the `matchId` option it was
//! given. Tables are plain RFC 4180 CSV: quoted fields may contain commas,
//! doubled quotes and line breaks. The plugin writes a description row under
//! the header; it never carries a match id, so filtering removes it.

use camino::{Utf8Path, Utf8PathBuf};
use mt_core::DatatableRow;
use tracing::debug;

use crate::error::ScanError;
use crate::walker::FileWalker;

/// Parses CSV text into records.
///
/// # Errors
///
/// Returns the reason as a string if a quoted field is not terminated.
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_owned());
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

/// Normalizes a header so `matchId`, `Match ID` and `match_id` compare equal.
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Reads one table and keeps the rows whose match id column equals `match_id`.
///
/// Tables without a match id column yield no rows.
///
/// # Errors
///
/// Returns [`ScanError::Read`] or [`ScanError::Report`] if the file cannot be
/// read or parsed.
pub fn read_rows(path: &Utf8Path, match_id: &str) -> Result<Vec<DatatableRow>, ScanError> {
    let text = std::fs::read_to_string(path).map_err(|e| ScanError::read(path, e))?;
    let records = parse_csv(&text).map_err(|reason| ScanError::report(path, reason))?;

    let Some((header, rows)) = records.split_first() else {
        return Ok(Vec::new());
    };
    let Some(id_column) = header
        .iter()
        .position(|h| normalize_header(h) == "matchid")
    else {
        debug!(table = %path, "data table has no match id column");
        return Ok(Vec::new());
    };

    Ok(rows
        .iter()
        .filter(|row| row.get(id_column).is_some_and(|v| v == match_id))
        .map(|row| DatatableRow {
            match_id: match_id.to_owned(),
            columns: header.iter().cloned().zip(row.iter().cloned()).collect(),
        })
        .collect())
}

/// Lists every `*.csv` file below `dir`, sorted. A missing directory yields none.
///
/// Ignore files do not apply: build output is usually gitignored.
///
/// # Errors
///
/// Returns [`ScanError::Walk`] if a directory cannot be listed.
pub fn table_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ScanError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    FileWalker::new(dir)?
        .with_standard_filters(false)
        .with_glob("*.csv")?
        .collect_paths()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_fields() {
        let records = parse_csv("a,b,c\n\"x, y\",\"say \"\"hi\"\"\",\"multi\nline\"\r\n").unwrap();
        assert_eq!(
            records,
            vec![
                vec!["a", "b", "c"],
                vec!["x, y", "say \"hi\"", "multi\nline"],
            ]
        );
    }

    #[test]
    fn test_parse_trailing_record_without_newline() {
        let records = parse_csv("a,b\n1,").unwrap();
        assert_eq!(records, vec![vec!["a", "b"], vec!["1", ""]]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(parse_csv("a\n\"oops").is_err());
    }

    #[test]
    fn test_read_rows_filters_by_match_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("t.csv")).unwrap();
        std::fs::write(
            &path,
            "Source path,Match ID,Annotation\n\
             The source file,The match id,The annotation\n\
             src/A.java,rule-001,@Entity\n\
             src/B.java,rule-002,@Entity\n",
        )
        .unwrap();

        let rows = read_rows(&path, "rule-001").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].column("Source path"), Some("src/A.java"));
        assert_eq!(rows[0].match_id, "rule-001");
    }

    #[test]
    fn test_table_files_recurses() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("2024/run")).unwrap();
        std::fs::write(root.join("2024/run/b.csv"), "").unwrap();
        std::fs::write(root.join("a.csv"), "").unwrap();
        std::fs::write(root.join("notes.txt"), "").unwrap();

        let files = table_files(&root).unwrap();
        assert_eq!(files, vec![root.join("2024/run/b.csv"), root.join("a.csv")]);
        assert!(table_files(&root.join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_table_files_ignore_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("target/rewrite/datatables/2026-01-01")).unwrap();
        std::fs::write(root.join(".gitignore"), "*.csv\ntarget/\n").unwrap();
        std::fs::write(root.join("target/.gitignore"), "*\n").unwrap();
        let table = root.join("target/rewrite/datatables/2026-01-01/FindMethods.csv");
        std::fs::write(&table, "").unwrap();

        assert_eq!(table_files(&root.join("target/rewrite/datatables")).unwrap(), vec![table]);
    }
}
