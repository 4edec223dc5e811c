//! File system scanner for `file.name` and `file.content` queries.
//!
//! Paths come from [`FileWalker`], so `.gitignore` rules and the configured
//! skip directories apply. Content searches run over the collected paths in
//! parallel; an unreadable file is logged and skipped.

use camino::Utf8Path;
use mt_core::{LineLocation, Match, MatchPayload, Query, ScannerKind, ScannerRequest};
use rayon::prelude::*;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::scanner::{ScanContext, Scanner, unexpected_request};
use crate::walker::FileWalker;

/// Searches file names and file contents below the project root.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileScanner;

impl FileScanner {
    fn walker(ctx: &ScanContext<'_>, glob: Option<&str>) -> Result<FileWalker, ScanError> {
        let walker = FileWalker::new(ctx.project_root)?
            .with_skip_dirs(&ctx.config.scan.skip_dirs)
            .with_follow_links(ctx.config.scan.follow_links);
        match glob {
            Some(glob) => walker.with_glob(glob),
            None => Ok(walker),
        }
    }
}

fn location_match(source: &Utf8Path, line: u32, column: u32, text: String) -> Match {
    Match::new(
        source.as_str(),
        ScannerKind::File,
        MatchPayload::Location(LineLocation {
            path: source.to_path_buf(),
            line,
            column,
            text,
        }),
    )
}

/// Returns every line of `text` that `pattern` matches, as one-based
/// `(line, column, line text)` triples.
fn search_lines(pattern: &Regex, text: &str) -> Vec<(u32, u32, String)> {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let found = pattern.find(line)?;
            let column = line[..found.start()].chars().count() + 1;
            Some((
                u32::try_from(index + 1).unwrap_or(u32::MAX),
                u32::try_from(column).unwrap_or(u32::MAX),
                line.to_owned(),
            ))
        })
        .collect()
}

impl Scanner for FileScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::File
    }

    fn supports(&self, query: &Query) -> bool {
        query.resource_kind == "file" && matches!(query.symbol.as_str(), "name" | "content")
    }

    fn scan(&self, ctx: &ScanContext<'_>, query: &Query) -> Result<Vec<Match>, ScanError> {
        let request = match ctx.request(self.kind(), query)? {
            ScannerRequest::File(request) => request,
            other => return Err(unexpected_request(self.kind(), &other)),
        };

        let Some(content) = request.content_pattern else {
            let Some(name) = request.name_pattern else {
                return Err(ScanError::illegal_state(format!(
                    "file query has neither a name nor a content pattern: {query}"
                )));
            };
            let walker = Self::walker(ctx, Some(&name))?;
            let matches: Vec<Match> = walker
                .collect_paths()?
                .iter()
                .map(|path| location_match(walker.relative(path), 0, 0, String::new()))
                .collect();
            debug!(rule_id = ctx.rule_id, pattern = %name, files = matches.len(), "file name search finished");
            return Ok(matches);
        };

        let pattern = Regex::new(&content).map_err(|e| ScanError::invalid_pattern(&content, e))?;
        let walker = Self::walker(ctx, request.name_pattern.as_deref())?;
        let paths = walker.collect_paths()?;

        let matches: Vec<Match> = paths
            .par_iter()
            .flat_map_iter(|path| {
                let hits = match std::fs::read_to_string(path) {
                    Ok(text) => search_lines(&pattern, &text),
                    Err(e) => {
                        let err = ScanError::read(path, e);
                        warn!(error = %err, "skipping unreadable file");
                        Vec::new()
                    }
                };
                let source = walker.relative(path);
                hits.into_iter()
                    .map(move |(line, column, text)| location_match(source, line, column, text))
            })
            .collect();

        debug!(
            rule_id = ctx.rule_id,
            pattern = %content,
            files = paths.len(),
            matches = matches.len(),
            "content search finished"
        );
        Ok(matches)
    }
}
