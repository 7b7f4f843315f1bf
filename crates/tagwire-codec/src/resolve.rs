//! Shape resolution for nested `0x01`/`0x02` tags.
//!
//! Inside a list or map, `0x01` is either a bool or a nested list and `0x02`
//! either an int32 or a nested map. The bytes alone do not say which, so
//! before decoding we walk the message structure (without building values)
//! looking for a reading under which every count is satisfied and the root
//! ends exactly at the end of the buffer.
//!
//! The walk is a depth-first search over the readings of each dual-use tag.
//! Three things keep it polynomial on well-formed input:
//!
//! - A state that already failed is never explored twice. A state is the tag
//!   offset, the count left in the innermost open collection and the identity
//!   of that collection; everything after the tag depends only on those.
//! - A reading is cut as soon as the counts still open need more bytes than
//!   remain.
//! - Several search orders are tried in turn, each with its own step budget.
//!   Most messages resolve under the first one with little or no
//!   backtracking; the others cover layouts that are quadratic under it.
//!
//! The encoder never writes a key twice in one map, so readings without
//! duplicate keys are searched first. Only when none exists is a reading
//! with duplicates accepted (later entries then win in the decoded map).
//!
//! Open collections live in a frame arena. Frames are pushed when a
//! collection opens and a choice point truncates the arena on backtrack, so
//! abandoned readings release their frames.
//!
//! The result is one flag per dual-use tag, in wire order: `true` means the
//! tag opens a nested collection.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::config::DecodeConfig;
use crate::cursor::Cursor;
use crate::error::{CodecError, Result};
use crate::tag;

/// Minimum wire size of one list element (`0x00`).
const MIN_ELEMENT_LEN: usize = 1;

/// Minimum wire size of one map entry (empty key, `0x00`).
const MIN_ENTRY_LEN: usize = 3;

/// Counts below this are tried as collections first by the orders that
/// prefer short collections.
const SHORT_COLLECTION: u32 = 256;

/// Failed states remembered beyond one per input byte.
const DEAD_STATE_SLACK: usize = 4096;

/// Resolve the shape of every nested dual-use tag in `buf`.
pub(crate) fn resolve(buf: &[u8], config: &DecodeConfig) -> Result<Vec<bool>> {
    let mut best: Option<(Rank, CodecError)> = None;
    for distinct_keys in [true, false] {
        for order in SearchOrder::ALL {
            let mut search = Search::new(buf, config, order, distinct_keys);
            match search.run() {
                Outcome::Resolved => return Ok(search.shapes),
                // Errors are reported from the unrestricted search only.
                Outcome::Exhausted(_) if distinct_keys => break,
                Outcome::OutOfBudget(_) if distinct_keys => {}
                Outcome::Exhausted(err) => return Err(err),
                Outcome::OutOfBudget(err) => {
                    let rank = Rank::of(&err);
                    match &best {
                        Some((seen, _)) if *seen >= rank => {}
                        _ => best = Some((rank, err)),
                    }
                }
            }
        }
    }
    match best {
        Some((_, err)) => Err(err),
        None => Err(CodecError::BufferUnderrun {
            offset: 0,
            needed: 1,
            available: buf.len(),
        }),
    }
}

/// Which reading of a dual-use tag the search tries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchOrder {
    /// Short lists first; maps as int32 first.
    ShortLists,
    /// Always the primitive reading first.
    Primitive,
    /// Short lists and short non-empty maps first.
    ShortCollections,
}

impl SearchOrder {
    const ALL: [SearchOrder; 3] = [
        SearchOrder::ShortLists,
        SearchOrder::Primitive,
        SearchOrder::ShortCollections,
    ];

    fn collection_first(self, tag: u8, count: u32) -> bool {
        match self {
            SearchOrder::ShortLists => tag == tag::LIST && count < SHORT_COLLECTION,
            SearchOrder::Primitive => false,
            SearchOrder::ShortCollections => match tag {
                tag::LIST => count < SHORT_COLLECTION,
                _ => count > 0 && count < SHORT_COLLECTION,
            },
        }
    }
}

/// An open list or map.
#[derive(Debug, Clone, Copy)]
struct Frame {
    parent: Option<usize>,
    /// Count left in the parent once this collection closes.
    resume: u32,
    is_map: bool,
    depth: usize,
    /// Never reused, unlike the arena index.
    serial: u64,
    /// Minimum bytes the enclosing collections still need after this one.
    outer_need: usize,
    /// Key digest of the parent once this collection closes.
    resume_digest: u64,
}

impl Frame {
    fn min_len(&self) -> usize {
        if self.is_map {
            MIN_ENTRY_LEN
        } else {
            MIN_ELEMENT_LEN
        }
    }

    /// Minimum bytes needed to finish this collection and every enclosing one.
    fn need(&self, remaining: u32) -> usize {
        self.min_len()
            .saturating_mul(remaining as usize)
            .saturating_add(self.outer_need)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reading {
    Primitive,
    Collection,
}

/// A dual-use tag whose other reading has not been tried yet.
#[derive(Debug, Clone, Copy)]
struct Choice {
    tag: u8,
    after_tag: usize,
    top: usize,
    remaining: u32,
    shapes_len: usize,
    frames_len: usize,
    keys_len: usize,
    digest: u64,
    untried: Reading,
}

/// Failure ranking: a depth violation first, then the furthest offset, then
/// malformed data over truncation at the same offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Rank {
    limit: bool,
    offset: usize,
    malformed: bool,
}

impl Rank {
    fn of(err: &CodecError) -> Self {
        let (limit, offset, malformed) = match err {
            CodecError::DepthLimitExceeded { .. } => (true, 0, false),
            CodecError::BufferUnderrun { offset, .. } => (false, *offset, false),
            CodecError::UnknownTag { offset, .. }
            | CodecError::InvalidBool { offset, .. }
            | CodecError::InvalidUtf8 { offset }
            | CodecError::TrailingBytes { offset, .. } => (false, *offset, true),
            CodecError::InvalidRoot { .. } | CodecError::UnsupportedType(_) => (false, 0, false),
        };
        Self {
            limit,
            offset,
            malformed,
        }
    }
}

#[derive(Debug)]
enum Outcome {
    Resolved,
    /// Every reading failed.
    Exhausted(CodecError),
    /// The step budget ran out before the search finished.
    OutOfBudget(CodecError),
}

enum Step {
    Continue,
    Done,
    /// The state was already explored and failed.
    Dead,
    /// A key repeats within one map while keys must be distinct.
    DuplicateKey,
}

struct Search<'a> {
    cursor: Cursor<'a>,
    order: SearchOrder,
    max_depth: usize,
    budget: usize,
    steps: usize,
    frames: Vec<Frame>,
    serial: u64,
    top: Option<usize>,
    remaining: u32,
    /// Order-independent digest of the keys read so far in the top map.
    digest: u64,
    distinct_keys: bool,
    keys: HashSet<(u64, &'a str)>,
    key_log: Vec<(u64, &'a str)>,
    shapes: Vec<bool>,
    choices: Vec<Choice>,
    dead: HashSet<(usize, u32, u64, u64)>,
    dead_cap: usize,
    best: Option<(Rank, CodecError)>,
    backtracks: usize,
    revisits: usize,
}

impl<'a> Search<'a> {
    fn new(
        buf: &'a [u8],
        config: &DecodeConfig,
        order: SearchOrder,
        distinct_keys: bool,
    ) -> Self {
        Self {
            cursor: Cursor::new(buf),
            order,
            max_depth: config.max_depth,
            budget: config.search_budget(buf.len()),
            steps: 0,
            frames: Vec::new(),
            serial: 0,
            top: None,
            remaining: 0,
            digest: 0,
            distinct_keys,
            keys: HashSet::new(),
            key_log: Vec::new(),
            shapes: Vec::new(),
            choices: Vec::new(),
            dead: HashSet::new(),
            dead_cap: buf.len().saturating_add(DEAD_STATE_SLACK),
            best: None,
            backtracks: 0,
            revisits: 0,
        }
    }

    fn run(&mut self) -> Outcome {
        if let Err(err) = self.open_root() {
            return Outcome::Exhausted(err);
        }

        loop {
            self.steps += 1;
            if self.steps > self.budget {
                if let Some((_, err)) = self.best.take() {
                    debug!(
                        order = ?self.order,
                        distinct_keys = self.distinct_keys,
                        steps = self.steps,
                        backtracks = self.backtracks,
                        revisits = self.revisits,
                        "shape resolution budget spent"
                    );
                    return Outcome::OutOfBudget(err);
                }
            }

            let failed = match self.step() {
                Ok(Step::Done) => {
                    if self.backtracks > 0 {
                        debug!(
                            order = ?self.order,
                            backtracks = self.backtracks,
                            dual_tags = self.shapes.len(),
                            "resolved nested tags after backtracking"
                        );
                    }
                    return Outcome::Resolved;
                }
                Ok(Step::Continue) => false,
                Ok(Step::Dead | Step::DuplicateKey) => true,
                Err(err) => {
                    self.record(err);
                    true
                }
            };

            if failed && !self.backtrack() {
                return Outcome::Exhausted(self.take_error());
            }
        }
    }

    /// The root tag is read in the structural namespace, so it never forms a
    /// choice point.
    fn open_root(&mut self) -> Result<()> {
        let offset = self.cursor.position();
        match self.cursor.read_u8()? {
            tag::LIST => self.open(None, false),
            tag::MAP => self.open(None, true),
            other => self.skip_primitive(other, offset),
        }
    }

    /// Advance by one element.
    fn step(&mut self) -> Result<Step> {
        // Close every finished collection in one step so a deep chain costs
        // the budget once per element, not once per level.
        while let Some(idx) = self.top {
            if self.remaining != 0 {
                break;
            }
            let frame = self.frames[idx];
            self.top = frame.parent;
            self.remaining = frame.resume;
            self.digest = frame.resume_digest;
        }

        let Some(top) = self.top else {
            let remaining = self.cursor.remaining();
            if remaining == 0 {
                return Ok(Step::Done);
            }
            return Err(CodecError::TrailingBytes {
                offset: self.cursor.position(),
                remaining,
            });
        };

        let frame = self.frames[top];
        let needed = frame.need(self.remaining);
        let available = self.cursor.remaining();
        if needed > available {
            return Err(CodecError::BufferUnderrun {
                offset: self.cursor.position(),
                needed,
                available,
            });
        }

        if frame.is_map {
            let key_len = self.cursor.read_u16()?;
            let key = self.cursor.read_str(usize::from(key_len))?;
            if self.distinct_keys {
                if !self.keys.insert((frame.serial, key)) {
                    return Ok(Step::DuplicateKey);
                }
                self.key_log.push((frame.serial, key));
                self.digest ^= key_digest(key);
            }
        }

        let offset = self.cursor.position();
        let tag = self.cursor.read_u8()?;
        if tag::is_dual_use(tag) {
            let state = (offset, self.remaining, frame.serial, self.digest);
            if self.dead.contains(&state) {
                self.revisits += 1;
                return Ok(Step::Dead);
            }
            if self.dead.len() < self.dead_cap {
                self.dead.insert(state);
            }
            self.remaining -= 1;
            self.choose(tag, top)?;
        } else {
            self.remaining -= 1;
            self.skip_primitive(tag, offset)?;
        }
        Ok(Step::Continue)
    }

    fn choose(&mut self, tag: u8, top: usize) -> Result<()> {
        let mut choice = Choice {
            tag,
            after_tag: self.cursor.position(),
            top,
            remaining: self.remaining,
            shapes_len: self.shapes.len(),
            frames_len: self.frames.len(),
            keys_len: self.key_log.len(),
            digest: self.digest,
            untried: Reading::Collection,
        };

        let count = match self.collection_fits(&choice) {
            Ok(count) => count,
            Err(err) => {
                self.record(err);
                return self.read_primitive(tag);
            }
        };

        if self.order.collection_first(tag, count) {
            choice.untried = Reading::Primitive;
            self.choices.push(choice);
            self.read_collection(&choice)
        } else {
            self.choices.push(choice);
            self.read_primitive(tag)
        }
    }

    /// Check that the collection reading of a choice could succeed and
    /// return its count.
    fn collection_fits(&self, choice: &Choice) -> Result<u32> {
        let parent = self.frames[choice.top];
        if parent.depth + 1 > self.max_depth {
            return Err(CodecError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }

        let mut ahead = self.cursor;
        ahead.seek(choice.after_tag);
        let count = ahead.read_u32()?;
        let min_len = if choice.tag == tag::MAP {
            MIN_ENTRY_LEN
        } else {
            MIN_ELEMENT_LEN
        };
        let needed = min_len
            .saturating_mul(count as usize)
            .saturating_add(parent.need(choice.remaining));
        let available = ahead.remaining();
        if needed > available {
            return Err(CodecError::BufferUnderrun {
                offset: ahead.position(),
                needed,
                available,
            });
        }
        Ok(count)
    }

    fn read_primitive(&mut self, tag: u8) -> Result<()> {
        self.shapes.push(false);
        if tag == tag::BOOL {
            self.cursor.read_bool()?;
        } else {
            self.cursor.take(4)?;
        }
        Ok(())
    }

    fn read_collection(&mut self, choice: &Choice) -> Result<()> {
        self.shapes.push(true);
        self.open(Some(choice.top), choice.tag == tag::MAP)
    }

    /// Retry the most recent choice point with its untried reading.
    fn backtrack(&mut self) -> bool {
        while let Some(choice) = self.choices.pop() {
            self.backtracks += 1;
            self.cursor.seek(choice.after_tag);
            self.top = Some(choice.top);
            self.remaining = choice.remaining;
            self.digest = choice.digest;
            self.frames.truncate(choice.frames_len);
            self.shapes.truncate(choice.shapes_len);
            for key in self.key_log.drain(choice.keys_len..) {
                self.keys.remove(&key);
            }

            let retried = match choice.untried {
                Reading::Primitive => self.read_primitive(choice.tag),
                Reading::Collection => self.read_collection(&choice),
            };
            match retried {
                Ok(()) => return true,
                Err(err) => self.record(err),
            }
        }
        false
    }

    fn open(&mut self, parent: Option<usize>, is_map: bool) -> Result<()> {
        let (depth, outer_need) = match parent {
            Some(idx) => {
                let frame = &self.frames[idx];
                (frame.depth + 1, frame.need(self.remaining))
            }
            None => (1, 0),
        };
        if depth > self.max_depth {
            return Err(CodecError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        let count = self.cursor.read_u32()?;

        self.serial += 1;
        self.frames.push(Frame {
            parent,
            resume: self.remaining,
            is_map,
            depth,
            serial: self.serial,
            outer_need,
            resume_digest: self.digest,
        });
        self.top = Some(self.frames.len() - 1);
        self.remaining = count;
        self.digest = 0;
        Ok(())
    }

    fn skip_primitive(&mut self, tag: u8, offset: usize) -> Result<()> {
        match tag {
            tag::NULL => {}
            tag::FLOAT64 => {
                self.cursor.take(8)?;
            }
            tag::TEXT => {
                let len = self.cursor.read_u32()? as usize;
                self.cursor.read_str(len)?;
            }
            other => return Err(CodecError::UnknownTag { tag: other, offset }),
        }
        Ok(())
    }

    fn record(&mut self, err: CodecError) {
        let rank = Rank::of(&err);
        match &self.best {
            Some((best, _)) if *best >= rank => {}
            _ => self.best = Some((rank, err)),
        }
    }

    fn take_error(&mut self) -> CodecError {
        match self.best.take() {
            Some((_, err)) => err,
            None => CodecError::BufferUnderrun {
                offset: self.cursor.position(),
                needed: 1,
                available: 0,
            },
        }
    }
}

fn key_digest(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes(bytes: &[u8]) -> Result<Vec<bool>> {
        resolve(bytes, &DecodeConfig::default())
    }

    fn list_header(count: u32) -> Vec<u8> {
        let mut bytes = vec![tag::LIST];
        bytes.extend_from_slice(&count.to_be_bytes());
        bytes
    }

    #[test]
    fn flat_primitives_need_no_backtracking() {
        // [true, 7]
        let bytes = [
            0x01, 0, 0, 0, 2, //
            0x01, 0x01, //
            0x02, 0, 0, 0, 7,
        ];
        assert_eq!(shapes(&bytes).unwrap(), vec![false, false]);
    }

    #[test]
    fn nested_empty_list_is_structural() {
        // [[]]
        let bytes = [0x01, 0, 0, 0, 1, 0x01, 0, 0, 0, 0];
        assert_eq!(shapes(&bytes).unwrap(), vec![true]);
    }

    #[test]
    fn nested_map_followed_by_int() {
        // [{"a": 1, "b": "x"}]
        let bytes = [
            0x01, 0, 0, 0, 1, //
            0x02, 0, 0, 0, 2, //
            0, 1, b'a', 0x02, 0, 0, 0, 1, //
            0, 1, b'b', 0x04, 0, 0, 0, 1, b'x',
        ];
        assert_eq!(shapes(&bytes).unwrap(), vec![true, false]);
    }

    #[test]
    fn root_tag_is_never_a_choice() {
        let bytes = [0x02, 0, 0, 0, 0];
        assert_eq!(shapes(&bytes).unwrap(), Vec::<bool>::new());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let bytes = [0x01, 0, 0, 0, 0, 0x00];
        assert_eq!(
            shapes(&bytes).unwrap_err(),
            CodecError::TrailingBytes {
                offset: 5,
                remaining: 1
            }
        );
    }

    #[test]
    fn truncated_nested_list_reports_underrun() {
        // [[null, null, null]] cut after the first nested element
        let bytes = [0x01, 0, 0, 0, 1, 0x01, 0, 0, 0, 3, 0x00];
        assert!(matches!(
            shapes(&bytes).unwrap_err(),
            CodecError::BufferUnderrun { offset: 10, .. }
        ));
    }

    #[test]
    fn unknown_tag_after_nested_bool() {
        // [false, <0xFF>]: the list reading of 0x01 underruns earlier in the
        // buffer than the unknown tag, so the tag is what gets reported.
        let bytes = [0x01, 0, 0, 0, 2, 0x01, 0x00, 0xFF];
        assert_eq!(
            shapes(&bytes).unwrap_err(),
            CodecError::UnknownTag {
                tag: 0xFF,
                offset: 7
            }
        );
    }

    #[test]
    fn invalid_bool_outranks_truncated_list_reading() {
        let bytes = [0x01, 0, 0, 0, 1, 0x01, 0x02];
        assert_eq!(
            shapes(&bytes).unwrap_err(),
            CodecError::InvalidBool { byte: 2, offset: 6 }
        );
    }

    #[test]
    fn depth_limit_applies_to_structural_reading() {
        // [[[]]] with max depth 2
        let bytes = [
            0x01, 0, 0, 0, 1, //
            0x01, 0, 0, 0, 1, //
            0x01, 0, 0, 0, 0,
        ];
        let config = DecodeConfig {
            max_depth: 2,
            ..DecodeConfig::default()
        };
        assert_eq!(
            resolve(&bytes, &config).unwrap_err(),
            CodecError::DepthLimitExceeded { limit: 2 }
        );
        assert_eq!(
            resolve(&bytes, &DecodeConfig::default()).unwrap(),
            vec![true, true]
        );
    }

    #[test]
    fn many_empty_lists_resolve_within_a_byte_budget() {
        let count = 20_000;
        let mut bytes = list_header(count);
        for _ in 0..count {
            bytes.extend_from_slice(&list_header(0));
        }
        let config = DecodeConfig {
            search_steps_per_byte: 1,
            ..DecodeConfig::default()
        };
        let resolved = resolve(&bytes, &config).unwrap();
        assert_eq!(resolved.len(), count as usize);
        assert!(resolved.iter().all(|shape| *shape));
    }

    #[test]
    fn false_followed_by_nulls_stays_primitive() {
        // [false, null, null, null] repeated: each group also reads as `[]`.
        let groups = 4_000;
        let mut bytes = list_header(groups * 4);
        for _ in 0..groups {
            bytes.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x00]);
        }
        let resolved = shapes(&bytes).unwrap();
        assert_eq!(resolved.len(), groups as usize);
        assert!(resolved.iter().all(|shape| !*shape));
    }

    #[test]
    fn single_entry_maps_with_empty_keys() {
        // [{"": 1}] repeated
        let maps = 2_000;
        let mut bytes = list_header(maps);
        for _ in 0..maps {
            bytes.extend_from_slice(&[0x02, 0, 0, 0, 1, 0, 0, 0x02, 0, 0, 0, 1]);
        }
        let resolved = shapes(&bytes).unwrap();
        assert_eq!(resolved.len(), 2 * maps as usize);
        assert!(resolved
            .chunks(2)
            .all(|pair| pair == [true, false].as_slice()));
    }

    #[test]
    fn backtracking_releases_frames() {
        let groups = 50;
        let mut bytes = list_header(groups * 4);
        for _ in 0..groups {
            bytes.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x00]);
        }
        let config = DecodeConfig::default();
        let mut search = Search::new(&bytes, &config, SearchOrder::ShortLists, true);
        assert!(matches!(search.run(), Outcome::Resolved));
        assert!(search.backtracks > 0);

        let open_collections = search.shapes.iter().filter(|shape| **shape).count();
        assert_eq!(search.frames.len(), 1 + open_collections);
    }

    #[test]
    fn failed_states_are_not_revisited() {
        // [0, <0x02>]: reading the first 0x02 as an empty map instead of
        // int32 0 lands on the same failing tag with the same count left.
        let bytes = [0x01, 0, 0, 0, 2, 0x02, 0, 0, 0, 0, 0x02];
        let config = DecodeConfig::default();
        let mut search = Search::new(&bytes, &config, SearchOrder::Primitive, true);
        match search.run() {
            Outcome::Exhausted(err) => assert!(matches!(
                err,
                CodecError::BufferUnderrun { offset: 11, .. }
            )),
            other => panic!("expected exhausted search, got {other:?}"),
        }
        assert_eq!(search.revisits, 1);
    }

    #[test]
    fn readings_with_distinct_keys_come_first() {
        // [{"a": {"a": false}, "": null}] also reads as [{"a": 1, "a": []}]
        let bytes = [
            0x01, 0, 0, 0, 1, //
            0x02, 0, 0, 0, 2, //
            0, 1, b'a', 0x02, 0, 0, 0, 1, //
            0, 1, b'a', 0x01, 0x00, //
            0, 0, 0x00,
        ];
        assert_eq!(shapes(&bytes).unwrap(), vec![true, true, false]);

        let config = DecodeConfig::default();
        let mut search = Search::new(&bytes, &config, SearchOrder::ShortLists, false);
        assert!(matches!(search.run(), Outcome::Resolved));
        assert_eq!(search.shapes, vec![true, false, true]);
    }

    #[test]
    fn duplicate_keys_resolve_when_nothing_else_fits() {
        // {"a": 1, "a": true}
        let bytes = [
            0x02, 0, 0, 0, 2, //
            0, 1, b'a', 0x02, 0, 0, 0, 1, //
            0, 1, b'a', 0x01, 0x01,
        ];
        assert_eq!(shapes(&bytes).unwrap(), vec![false, false]);
    }
}
