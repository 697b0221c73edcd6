//! The work-call contract between blocks and the host runtime.
//!
//! The runtime invokes each block serially, handing it a window over the
//! stream buffers it owns. A sink reports back how many items it consumed;
//! anything left unconsumed (and any tag attached to it) is redelivered on
//! the next call. Blocks never own buffer memory and never decide when
//! they are called.

use num_complex::Complex32;

use crate::error::{Error, Result};
use crate::tag::Tag;
use crate::value::Value;

/// One work call's view of an input stream.
///
/// Holds the raw item bytes, the absolute offset of the first item
/// (`nitems_read`), and the tags whose offsets fall inside the window.
pub struct InputWindow<'a> {
    items: &'a [u8],
    item_size: usize,
    nitems_read: u64,
    tags: &'a [Tag],
}

impl<'a> InputWindow<'a> {
    /// Build a window over `items`, whose first item sits at absolute
    /// stream offset `nitems_read`.
    ///
    /// `tags` must be sorted by offset and confined to
    /// `[nitems_read, nitems_read + len)`.
    pub fn new(
        items: &'a [u8],
        item_size: usize,
        nitems_read: u64,
        tags: &'a [Tag],
    ) -> Result<Self> {
        if item_size == 0 {
            return Err(Error::Configuration("item size must be non-zero".into()));
        }
        if items.len() % item_size != 0 {
            return Err(Error::Configuration(format!(
                "input buffer of {} bytes is not a whole number of {}-byte items",
                items.len(),
                item_size
            )));
        }
        debug_assert!(tags.windows(2).all(|pair| pair[0].offset <= pair[1].offset));
        Ok(Self {
            items,
            item_size,
            nitems_read,
            tags,
        })
    }

    /// Number of items in the window.
    pub fn len(&self) -> usize {
        self.items.len() / self.item_size
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The raw item bytes, in stream order.
    pub fn bytes(&self) -> &'a [u8] {
        self.items
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Absolute offset of the first item, i.e. the cumulative item count
    /// at the start of this work call.
    pub fn nitems_read(&self) -> u64 {
        self.nitems_read
    }

    /// All tags delivered with this window, sorted by offset.
    pub fn tags(&self) -> &'a [Tag] {
        self.tags
    }

    /// Tags of `key` whose absolute offsets lie in the half-open range
    /// `[start, end)`.
    pub fn tags_in_range<'s>(
        &'s self,
        start: u64,
        end: u64,
        key: &'s str,
    ) -> impl Iterator<Item = &'a Tag> + 's {
        self.tags
            .iter()
            .filter(move |tag| tag.key == key && tag.offset >= start && tag.offset < end)
    }

    /// The tag of `key` attached to exactly `offset`, if any.
    pub fn tag_at(&self, offset: u64, key: &str) -> Option<&'a Tag> {
        self.tags
            .iter()
            .find(|tag| tag.offset == offset && tag.key == key)
    }

    /// Decode the window as host-byte-order complex float32 items.
    ///
    /// Only meaningful for 8-byte (`fc32`) windows.
    pub fn complex32(&self) -> impl Iterator<Item = Complex32> + 'a {
        debug_assert_eq!(self.item_size, 8);
        self.items.chunks_exact(8).map(|chunk| {
            let re = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let im = f32::from_ne_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            Complex32::new(re, im)
        })
    }
}

/// One work call's view of an output stream.
///
/// Tags appended during the call are recovered by the runtime through
/// [`into_tags`](OutputWindow::into_tags) after the call returns.
pub struct OutputWindow<'a, T> {
    slots: &'a mut [T],
    nitems_written: u64,
    tags: Vec<Tag>,
}

impl<'a, T> OutputWindow<'a, T> {
    /// Build a window over `slots`, whose first slot sits at absolute
    /// stream offset `nitems_written`.
    pub fn new(slots: &'a mut [T], nitems_written: u64) -> Self {
        Self {
            slots,
            nitems_written,
            tags: Vec::new(),
        }
    }

    /// Number of output slots in the window.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Absolute offset of the first slot, i.e. the cumulative item count
    /// at the start of this work call.
    pub fn nitems_written(&self) -> u64 {
        self.nitems_written
    }

    /// The output slots, in stream order.
    pub fn slots(&mut self) -> &mut [T] {
        self.slots
    }

    /// Append a tag at an absolute offset on this stream.
    pub fn add_tag(&mut self, offset: u64, key: &str, value: Value, source: &str) {
        debug_assert!(
            offset >= self.nitems_written
                && offset < self.nitems_written + self.slots.len() as u64
        );
        self.tags.push(Tag::new(offset, key, value, source));
    }

    /// Tags appended so far during this call.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Consume the window, handing the appended tags to the runtime.
    pub fn into_tags(self) -> Vec<Tag> {
        self.tags
    }
}

/// A block that produces samples into an output stream.
pub trait StreamSource {
    /// The type of one output item.
    type Item;

    /// Fill `output`, returning the number of items produced.
    fn work(&mut self, output: &mut OutputWindow<'_, Self::Item>) -> Result<usize>;
}

/// A block that consumes an input stream and produces no stream output.
pub trait StreamSink {
    /// Consume up to `input.len()` items, returning how many were
    /// consumed. Returning less signals partial consumption; the runtime
    /// redelivers the remainder.
    fn work(&mut self, input: &InputWindow<'_>) -> Result<usize>;
}

/// A one-in/one-out block transforming items.
pub trait StreamTransform {
    /// The type of one output item.
    type Output;

    /// Consume input items, writing one output item per input item.
    /// Returns the number of items processed.
    fn work(&mut self, input: &InputWindow<'_>, output: &mut [Self::Output]) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_rejects_torn_items() {
        let bytes = [0u8; 10];
        assert!(InputWindow::new(&bytes, 4, 0, &[]).is_err());
        assert!(InputWindow::new(&bytes[..8], 4, 0, &[]).is_ok());
    }

    #[test]
    fn test_window_len_counts_items() {
        let bytes = [0u8; 32];
        let window = InputWindow::new(&bytes, 8, 100, &[]).unwrap();
        assert_eq!(window.len(), 4);
        assert_eq!(window.nitems_read(), 100);
    }

    #[test]
    fn test_tags_in_range_is_half_open() {
        let tags = vec![
            Tag::new(3, "rx_freq", Value::Float(1.0), "t"),
            Tag::new(5, "rx_freq", Value::Float(2.0), "t"),
            Tag::new(5, "gain", Value::Float(9.0), "t"),
            Tag::new(7, "rx_freq", Value::Float(3.0), "t"),
        ];
        let bytes = [0u8; 64];
        let window = InputWindow::new(&bytes, 8, 0, &tags).unwrap();

        let hits: Vec<u64> = window
            .tags_in_range(3, 7, "rx_freq")
            .map(|tag| tag.offset)
            .collect();
        assert_eq!(hits, vec![3, 5]);

        assert!(window.tag_at(5, "gain").is_some());
        assert!(window.tag_at(5, "phase").is_none());
    }

    #[test]
    fn test_complex32_decodes_host_order() {
        let mut bytes = Vec::new();
        for value in [1.5f32, -2.0, 0.25, 8.0] {
            bytes.extend_from_slice(&value.to_ne_bytes());
        }
        let window = InputWindow::new(&bytes, 8, 0, &[]).unwrap();
        let items: Vec<Complex32> = window.complex32().collect();
        assert_eq!(items, vec![Complex32::new(1.5, -2.0), Complex32::new(0.25, 8.0)]);
    }

    #[test]
    fn test_output_window_collects_tags() {
        let mut slots = [0.0f32; 4];
        let mut window = OutputWindow::new(&mut slots, 12);
        window.slots()[0] = 7.0;
        window.add_tag(12, "rx_freq", Value::Float(10.0), "src");
        window.add_tag(14, "rx_freq", Value::Float(20.0), "src");

        let tags = window.into_tags();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].offset, 12);
        assert_eq!(tags[1].value, Value::Float(20.0));
        assert_eq!(slots[0], 7.0);
    }
}
