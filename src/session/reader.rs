use log::{debug, trace};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use super::model::{EntryKind, LogEntry};

/// Longest line the tail reader will buffer. Entries can carry whole file contents
/// and reach several MB.
pub const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

/// Line cap for the summary scan; summary lines are short.
pub const MAX_SUMMARY_LINE_BYTES: usize = 1024 * 1024;

/// Read the last `count` well-formed entries of a JSONL log, in file order.
///
/// Blank lines, lines that fail to parse and lines longer than [`MAX_LINE_BYTES`] are
/// dropped. The last line may be half-written while the assistant is appending to it.
pub fn read_last_entries(path: &Path, count: usize) -> io::Result<Vec<LogEntry>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut entries: VecDeque<LogEntry> = VecDeque::with_capacity(count.min(1024));
    let mut skipped = 0usize;

    for_each_line(&mut reader, MAX_LINE_BYTES, |line| {
        match LogEntry::parse_line(line) {
            Some(entry) => {
                if count == 0 {
                    return;
                }
                if entries.len() == count {
                    entries.pop_front();
                }
                entries.push_back(entry);
            }
            None => {
                skipped += 1;
                trace!("Skipping malformed line in {:?}", path);
            }
        }
    })?;

    if skipped > 0 {
        debug!("Skipped {} malformed lines in {:?}", skipped, path);
    }

    Ok(entries.into())
}

/// Scan the whole file for the most recent summary entry.
/// Summaries usually sit near the start, so the tail can't be used for this.
/// Returns an empty string when there is none or the file can't be read.
pub fn extract_summary(path: &Path) -> String {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!("Failed to open {:?} for summary scan: {}", path, e);
            return String::new();
        }
    };
    let mut reader = BufReader::new(file);
    let mut last_summary = String::new();

    let result = for_each_line(&mut reader, MAX_SUMMARY_LINE_BYTES, |line| {
        // Quick check before full JSON parse
        if !line.contains("\"summary\"") {
            return;
        }
        if let Some(entry) = LogEntry::parse_line(line) {
            if entry.kind != EntryKind::Summary {
                return;
            }
            if let Some(summary) = entry.summary.filter(|s| !s.is_empty()) {
                last_summary = summary;
            }
        }
    });

    if let Err(e) = result {
        debug!("Summary scan of {:?} stopped early: {}", path, e);
    }

    last_summary
}

/// Feed every non-blank line to `f`. Lines longer than `max_line` bytes are consumed
/// without being held in memory and never reach `f`. Invalid UTF-8 lines are skipped.
fn for_each_line<R: BufRead, F: FnMut(&str)>(
    reader: &mut R,
    max_line: usize,
    mut f: F,
) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .by_ref()
            .take(max_line as u64 + 1)
            .read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Ok(());
        }

        let terminated = buf.last() == Some(&b'\n');
        if !terminated && buf.len() > max_line {
            trace!("Discarding oversized line (> {} bytes)", max_line);
            discard_rest_of_line(reader)?;
            continue;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(s) => s.trim(),
            Err(_) => continue,
        };
        if line.is_empty() {
            continue;
        }
        f(line);
    }
}

fn discard_rest_of_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let (done, used) = {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (true, pos + 1),
                None => (false, available.len()),
            }
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}
