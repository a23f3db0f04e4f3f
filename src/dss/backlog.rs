//! Lazily drained request lists (`wifiScanDataList`, `wifiNetworkInfoList`).
//!
//! Entries come from an iterator.  When an entry does not fit in the
//! current request it is kept and leads the next request, so nothing is
//! lost or duplicated across sequence numbers.

use log::warn;

use crate::error::{Error, Result};
use crate::json::{ArrayEncoder, ObjectEncoder};
use crate::stream::Stream;

/// Bytes that must stay free after an entry: `]` and `}`.
const CLOSING_RESERVE: usize = 2;

/// One list entry as serialized into a request.
pub trait ListEntry {
    /// `false` drops the entry without sending it.
    fn is_postable(&self) -> bool;
    fn encode(&self, out: &mut Stream<'_>) -> Result<()>;
}

pub struct Backlog<I: Iterator> {
    source: I,
    pending: Option<I::Item>,
    pulled: usize,
    accepted: usize,
}

impl<I: Iterator> Backlog<I> {
    pub fn new(source: I) -> Self {
        Self { source, pending: None, pulled: 0, accepted: 0 }
    }

    /// Whether any entry is still waiting to be sent.
    pub fn has_more(&mut self) -> bool {
        if self.pending.is_none() {
            self.pending = self.pull();
        }
        self.pending.is_some()
    }

    /// Entries written into requests so far.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Source items dealt with so far, sent or skipped.  A pending item
    /// does not count; a fresh backlog resumed at this offset picks it up
    /// again.
    pub fn consumed(&self) -> usize {
        self.pulled - usize::from(self.pending.is_some())
    }

    fn pull(&mut self) -> Option<I::Item> {
        let item = self.source.next();
        self.pulled += usize::from(item.is_some());
        item
    }

    fn take(&mut self) -> Option<I::Item> {
        match self.pending.take() {
            Some(item) => Some(item),
            None => self.pull(),
        }
    }
}

impl<I> Backlog<I>
where
    I: Iterator,
    I::Item: ListEntry,
{
    /// Append as many entries as fit under `key`.  The array is opened on
    /// the first entry, so an empty backlog adds nothing.  Returns the
    /// number of entries written.
    pub(super) fn drain_into(
        &mut self,
        key: &str,
        obj: &mut ObjectEncoder,
        out: &mut Stream<'_>,
    ) -> Result<usize> {
        let mut array: Option<ArrayEncoder> = None;
        let mut written = 0;

        while let Some(entry) = self.take() {
            if !entry.is_postable() {
                continue;
            }
            let mark = out.write_position();
            let saved = (*obj, array);

            let appended = append_entry(&entry, key, obj, &mut array, out);
            match appended {
                Ok(()) => written += 1,
                Err(Error::Overrun) if written > 0 => {
                    out.truncate_to(mark);
                    (*obj, array) = saved;
                    self.pending = Some(entry);
                    break;
                }
                Err(Error::Overrun) => {
                    out.truncate_to(mark);
                    warn!("DSS: {} entry too large for an empty request, dropped", key);
                    return Err(Error::Overrun);
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(array) = array {
            array.end(out)?;
        }
        self.accepted += written;
        Ok(written)
    }
}

fn append_entry(
    entry: &impl ListEntry,
    key: &str,
    obj: &mut ObjectEncoder,
    array: &mut Option<ArrayEncoder>,
    out: &mut Stream<'_>,
) -> Result<()> {
    let list = match array.as_mut() {
        Some(list) => list,
        None => {
            obj.key(key, out)?;
            array.insert(ArrayEncoder::begin(out)?)
        }
    };
    list.element(out)?;
    entry.encode(out)?;
    if out.space() < CLOSING_RESERVE {
        return Err(Error::Overrun);
    }
    Ok(())
}
