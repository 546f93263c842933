//! The tail/filter engine: memory-maps a file read-only and reverse-scans
//! for the start of the last `n` lines, then forward-scans from there,
//! applying the filter predicate and yielding passing lines as they're
//! found. Peak memory use beyond the mapping itself is one line at a time,
//! independent of total file size.

use std::path::PathBuf;

use bytes::Bytes;
use futures::Stream;
use tokio_stream::wrappers::ReceiverStream;

use crate::filter::FilterSpec;

/// Number of trailing lines to emit. `All` means the whole file (the `n=-1`
/// query value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailCount {
    All,
    Last(u64),
}

impl TailCount {
    pub fn from_query(n: Option<i64>) -> Self {
        match n {
            None | Some(-1) => TailCount::All,
            Some(n) if n < 0 => TailCount::All,
            Some(n) => TailCount::Last(n as u64),
        }
    }
}

/// Reverse-scans `data` for the byte offset at which the last `n` lines
/// begin. A file's own trailing newline terminates its last line rather
/// than introducing an extra empty one, so it is not counted as one of the
/// `n` boundaries being searched for.
fn find_start_offset(data: &[u8], count: TailCount) -> usize {
    let n = match count {
        TailCount::All => return 0,
        TailCount::Last(n) => n,
    };
    if data.is_empty() || n == 0 {
        return data.len();
    }

    let mut search_end = data.len();
    if data[search_end - 1] == b'\n' {
        search_end -= 1;
    }

    let mut start = 0;
    let mut found = 0u64;
    while found < n {
        match memchr::memrchr(b'\n', &data[..search_end]) {
            Some(newline_pos) => {
                start = newline_pos + 1;
                search_end = newline_pos;
                found += 1;
            }
            None => {
                start = 0;
                break;
            }
        }
    }
    start
}

/// Iterates `[line_start, line_end)` byte ranges of `data`, where each line
/// is bounded on the right by a newline byte or end-of-slice.
fn iter_lines(data: &[u8]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let len = data.len();
    let mut pos = Some(0usize);
    std::iter::from_fn(move || {
        let p = pos?;
        if p >= len {
            pos = None;
            return None;
        }
        match memchr::memchr(b'\n', &data[p..]) {
            Some(rel) => {
                pos = Some(p + rel + 1);
                Some((p, p + rel))
            }
            None => {
                pos = None;
                Some((p, len))
            }
        }
    })
}

/// Runs the reverse-scan + forward-emit algorithm against an already-mapped
/// region, invoking `on_line` for each line that passes `filters`.
/// `on_line` returns `false` to abort early (used for client disconnect).
fn scan(data: &[u8], count: TailCount, filters: &FilterSpec, mut on_line: impl FnMut(&[u8]) -> bool) {
    if data.is_empty() {
        return;
    }
    let start = find_start_offset(data, count);
    let tail = &data[start..];
    for (s, e) in iter_lines(tail) {
        let line = &tail[s..e];
        if filters.matches(line) && !on_line(line) {
            return;
        }
    }
}

/// Builds the chunked body stream for a `/log` request. The mmap and file
/// handle live only inside the spawned blocking task and are dropped when
/// it returns or the receiver is dropped (client disconnect), never shared
/// across requests.
pub fn emit_stream(
    path: PathBuf,
    count: TailCount,
    filters: FilterSpec,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::io::Error>>(32);

    tokio::task::spawn_blocking(move || {
        let result = (|| -> std::io::Result<()> {
            let file = std::fs::File::open(&path)?;
            if file.metadata()?.len() == 0 {
                return Ok(());
            }
            // SAFETY: the file is opened read-only and scoped to this task;
            // concurrent truncation by another process is a known, accepted
            // risk of mmap-based tailing, not one this service tries to guard against.
            let mmap = unsafe { memmap2::Mmap::map(&file)? };
            scan(&mmap, count, &filters, |line| {
                tx.blocking_send(Ok(Bytes::copy_from_slice(line))).is_ok()
            });
            Ok(())
        })();
        if let Err(e) = result {
            let _ = tx.blocking_send(Err(e));
        }
    });

    ReceiverStream::new(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSpec;

    fn lines_for(data: &[u8], count: TailCount, filters: &FilterSpec) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        scan(data, count, filters, |line| {
            out.push(line.to_vec());
            true
        });
        out
    }

    #[test]
    fn tail_all_splits_on_newlines_without_trailing_empty() {
        let data = b"alpha\nbeta\ngamma\n";
        let lines = lines_for(data, TailCount::All, &FilterSpec::default());
        assert_eq!(lines, vec![b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()]);
    }

    #[test]
    fn tail_two_lines() {
        let data = b"alpha\nbeta\ngamma\n";
        let lines = lines_for(data, TailCount::Last(2), &FilterSpec::default());
        assert_eq!(lines, vec![b"beta".to_vec(), b"gamma".to_vec()]);
    }

    #[test]
    fn tail_without_trailing_newline() {
        let data = b"alpha\nbeta\ngamma";
        let lines = lines_for(data, TailCount::Last(2), &FilterSpec::default());
        assert_eq!(lines, vec![b"beta".to_vec(), b"gamma".to_vec()]);
    }

    #[test]
    fn tail_n_larger_than_line_count_returns_whole_file() {
        let data = b"alpha\nbeta\ngamma\n";
        let lines = lines_for(data, TailCount::Last(100), &FilterSpec::default());
        assert_eq!(lines, vec![b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()]);
    }

    #[test]
    fn tail_zero_lines_emits_nothing() {
        let data = b"alpha\nbeta\ngamma\n";
        let lines = lines_for(data, TailCount::Last(0), &FilterSpec::default());
        assert!(lines.is_empty());
    }

    #[test]
    fn empty_file_emits_nothing() {
        let lines = lines_for(b"", TailCount::All, &FilterSpec::default());
        assert!(lines.is_empty());
    }

    #[test]
    fn and_filter_scenario() {
        let data = b"err code 500 x\nok code 200 y\nerr code 404 z\n";
        let filters = FilterSpec::parse(["and|err code"]);
        let lines = lines_for(data, TailCount::All, &filters);
        assert_eq!(
            lines,
            vec![b"err code 500 x".to_vec(), b"err code 404 z".to_vec()]
        );
    }

    #[test]
    fn or_filter_combined_with_and_scenario() {
        let data = b"err code 500 x\nok code 200 y\nerr code 404 z\n";
        let filters = FilterSpec::parse(["or|500 404", "err"]);
        let lines = lines_for(data, TailCount::All, &filters);
        assert_eq!(
            lines,
            vec![b"err code 500 x".to_vec(), b"err code 404 z".to_vec()]
        );
    }

    #[test]
    fn filtering_is_a_sublist_in_order() {
        let data = b"a 1\nb 2\na 3\nb 4\na 5\n";
        let all = lines_for(data, TailCount::All, &FilterSpec::default());
        let filtered = lines_for(data, TailCount::All, &FilterSpec::parse(["a"]));
        let mut it = all.iter();
        for line in &filtered {
            assert!(it.any(|x| x == line), "{:?} not found in order within {:?}", line, all);
        }
    }

    #[test]
    fn count_matches_min_n_line_count() {
        let data = b"one\ntwo\nthree\n";
        for n in 0..5u64 {
            let lines = lines_for(data, TailCount::Last(n), &FilterSpec::default());
            assert_eq!(lines.len(), n.min(3) as usize, "n={n}");
        }
    }
}
