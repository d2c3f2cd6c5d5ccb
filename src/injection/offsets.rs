use std::ops::Range;

use crate::error::{InjectionError, InjectionResult};
use crate::escaper::Escaper;

/// Linear stretch of the mapping: `decoded + i` ↦ `host + i` for `i <= len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    decoded: usize,
    host: usize,
    len: usize,
}

impl Run {
    fn decoded_end(&self) -> usize {
        self.decoded + self.len
    }

    fn host_end(&self) -> usize {
        self.host + self.len
    }
}

/// Snapshot of an escaper's decoded → host mapping for one shred.
///
/// Host offsets are relative to the start of the host element. Decoded offsets
/// inside an escape expansion have no entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    runs: Vec<Run>,
    decoded_len: usize,
    relevant: Range<usize>,
}

impl OffsetTable {
    /// Query `escaper` for every decoded offset and check its contract:
    /// mapped offsets never decrease, stay inside `relevant`, and the decoded
    /// length maps to `relevant.end`.
    pub fn build(
        escaper: &dyn Escaper,
        decoded_len: usize,
        relevant: &Range<usize>,
    ) -> InjectionResult<Self> {
        let mut runs: Vec<Run> = Vec::new();
        let mut previous: Option<usize> = None;

        for decoded in 0..=decoded_len {
            let Some(host) = escaper.offset_in_host(decoded, relevant) else {
                continue;
            };
            if host < relevant.start || host > relevant.end {
                return Err(InjectionError::escaper_contract(format!(
                    "decoded offset {decoded} maps to {host}, outside {}..{}",
                    relevant.start, relevant.end
                )));
            }
            if previous.is_some_and(|prev| host < prev) {
                return Err(InjectionError::escaper_contract(format!(
                    "mapping decreases at decoded offset {decoded}"
                )));
            }
            previous = Some(host);

            match runs.last_mut() {
                Some(run) if run.decoded_end() + 1 == decoded && run.host_end() + 1 == host => {
                    run.len += 1
                }
                _ => runs.push(Run {
                    decoded,
                    host,
                    len: 0,
                }),
            }
        }

        let end = runs
            .last()
            .filter(|run| run.decoded_end() == decoded_len)
            .map(Run::host_end);
        if end != Some(relevant.end) {
            return Err(InjectionError::escaper_contract(format!(
                "decoded length {decoded_len} maps to {end:?}, expected {}",
                relevant.end
            )));
        }

        Ok(Self {
            runs,
            decoded_len,
            relevant: relevant.clone(),
        })
    }

    pub fn decoded_len(&self) -> usize {
        self.decoded_len
    }

    /// Host range the table maps into.
    pub fn relevant(&self) -> &Range<usize> {
        &self.relevant
    }

    fn run_containing(&self, decoded: usize) -> Option<&Run> {
        let index = self.runs.partition_point(|run| run.decoded_end() < decoded);
        self.runs.get(index).filter(|run| run.decoded <= decoded)
    }

    /// Exact host offset, None when `decoded` sits inside an escape.
    pub fn host(&self, decoded: usize) -> Option<usize> {
        self.run_containing(decoded)
            .map(|run| run.host + (decoded - run.decoded))
    }

    /// Host offset of `decoded`, or of the next mapped decoded offset.
    pub fn resolve_forward(&self, decoded: usize) -> usize {
        if let Some(host) = self.host(decoded) {
            return host;
        }
        let index = self.runs.partition_point(|run| run.decoded_end() < decoded);
        self.runs
            .get(index)
            .map_or(self.relevant.end, |run| run.host)
    }

    /// Host offset of `decoded`, or of the previous mapped decoded offset.
    pub fn resolve_backward(&self, decoded: usize) -> usize {
        if let Some(host) = self.host(decoded) {
            return host;
        }
        let index = self.runs.partition_point(|run| run.decoded_end() < decoded);
        index
            .checked_sub(1)
            .and_then(|previous| self.runs.get(previous))
            .map_or(self.relevant.start, Run::host_end)
    }

    /// Decoded offset for a host offset.
    ///
    /// An exactly mapped host offset yields the first decoded offset mapped to
    /// it; an offset inside an escape yields the start of that escape.
    pub fn decoded_for_host(&self, host: usize) -> usize {
        let index = self.runs.partition_point(|run| run.host_end() < host);
        match self.runs.get(index) {
            Some(run) if run.host <= host => run.decoded + (host - run.host),
            _ => index
                .checked_sub(1)
                .and_then(|previous| self.runs.get(previous))
                .map_or(0, Run::decoded_end),
        }
    }
}
