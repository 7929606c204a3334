//! Record Cache Module
//!
//! Generic ordered list of records with merge-on-partial-update, a
//! fetched-all flag and derived size accounting. Purely synchronous; the
//! async caches wrap it in a lock.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use tracing::warn;

// == Record ==
/// An entity the cache can hold and merge partial updates into.
pub trait Record: Clone + PartialEq {
    /// Partial update carrying the record id and only the changed fields
    type Patch;

    fn id(&self) -> &str;

    fn patch_id(patch: &Self::Patch) -> &str;

    /// Materializes a record from a patch for an id not seen before.
    fn from_patch(patch: Self::Patch) -> Self;

    /// Overwrites the fields present in `patch`, keeps the rest.
    fn apply(&mut self, patch: Self::Patch);

    /// Size contributed to the owner's aggregate.
    fn content_len(&self) -> u64;

    /// Canonical list order.
    fn order(a: &Self, b: &Self) -> Ordering;
}

// == Reservations ==
/// Handle on an optimistic size change held by a `RecordCache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReservationId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Reservation {
    /// Post in flight, the remote has not named the record yet
    Unbound(i64),
    /// Released once a record with this id is cached
    Arrival(String, i64),
    /// Released once no record with this id is cached
    Removal(String, i64),
}

impl Reservation {
    fn delta(&self) -> i64 {
        match self {
            Reservation::Unbound(delta)
            | Reservation::Arrival(_, delta)
            | Reservation::Removal(_, delta) => *delta,
        }
    }
}

// == Record Cache ==
#[derive(Debug, Clone)]
pub struct RecordCache<R> {
    records: Vec<R>,
    /// True once a bulk fetch populated the list, until a resync signal
    fetched_all: bool,
    /// Optimistic size changes the cached list does not reflect yet
    reservations: BTreeMap<ReservationId, Reservation>,
    next_reservation: u64,
}

impl<R: Record> Default for RecordCache<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> RecordCache<R> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            fetched_all: false,
            reservations: BTreeMap::new(),
            next_reservation: 0,
        }
    }

    // == Get ==
    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    // == Insert ==
    /// Caches a record fetched by id, replacing any copy with the same id.
    pub fn insert(&mut self, record: R) {
        match self.records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        self.records.sort_by(R::order);
        self.settle();
    }

    // == Replace All ==
    /// Replaces the list wholesale with an authoritative one.
    ///
    /// A repeated id keeps its last occurrence. Returns whether the content
    /// changed.
    pub fn replace_all(&mut self, records: Vec<R>) -> bool {
        let mut unique: Vec<R> = Vec::with_capacity(records.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
        for record in records {
            match index.get(record.id()) {
                Some(&at) => unique[at] = record,
                None => {
                    index.insert(record.id().to_string(), unique.len());
                    unique.push(record);
                }
            }
        }
        unique.sort_by(R::order);

        let changed = unique != self.records;
        self.records = unique;
        self.settle();
        changed
    }

    // == Merge ==
    /// Shallow-merges each patch over the record with the same id; unseen
    /// ids are inserted. Records absent from `patches` are kept. Patches
    /// without an id are dropped.
    pub fn merge(&mut self, patches: Vec<R::Patch>) {
        for patch in patches {
            if R::patch_id(&patch).is_empty() {
                warn!("Dropping partial update without an id");
                continue;
            }
            let position = self
                .records
                .iter()
                .position(|r| r.id() == R::patch_id(&patch));
            match position {
                Some(index) => self.records[index].apply(patch),
                None => self.records.push(R::from_patch(patch)),
            }
        }
        self.records.sort_by(R::order);
        self.settle();
    }

    // == Fetched-all flag ==
    pub fn is_fetched_all(&self) -> bool {
        self.fetched_all
    }

    pub fn mark_fetched_all(&mut self) {
        self.fetched_all = true;
    }

    /// Forces the next bulk read to go remote. Cached records are kept.
    pub fn mark_stale(&mut self) {
        self.fetched_all = false;
    }

    // == Size ==
    /// Sum of `content_len` over cached records.
    pub fn total_size(&self) -> u64 {
        self.records.iter().map(R::content_len).sum()
    }

    /// Net size of the reservations still open.
    pub fn pending(&self) -> i64 {
        self.reservations.values().map(Reservation::delta).sum()
    }

    /// `total_size` with open reservations applied, floored at zero.
    pub fn projected_size(&self) -> u64 {
        (self.total_size() as i64 + self.pending()).max(0) as u64
    }

    // == Reservation lifecycle ==
    /// Opens a size change for a record the remote has not named yet.
    pub fn reserve(&mut self, delta: i64) -> ReservationId {
        self.open(Reservation::Unbound(delta))
    }

    /// Ties an open reservation to the id the remote assigned. It is
    /// released as soon as that record is cached, which may be right away.
    pub fn confirm_arrival(&mut self, reservation: ReservationId, id: &str) {
        if let Some(held) = self.reservations.get_mut(&reservation) {
            *held = Reservation::Arrival(id.to_string(), held.delta());
        }
        self.settle();
    }

    /// Opens a size change released once `id` is no longer cached.
    pub fn reserve_removal(&mut self, id: &str, delta: i64) -> ReservationId {
        let reservation = self.open(Reservation::Removal(id.to_string(), delta));
        self.settle();
        reservation
    }

    /// Drops a reservation whose mutation will not happen.
    pub fn release(&mut self, reservation: ReservationId) {
        self.reservations.remove(&reservation);
    }

    fn open(&mut self, reservation: Reservation) -> ReservationId {
        let id = ReservationId(self.next_reservation);
        self.next_reservation += 1;
        self.reservations.insert(id, reservation);
        id
    }

    /// Releases every reservation the cached list now reflects.
    fn settle(&mut self) {
        let records = &self.records;
        let cached = |id: &str| records.iter().any(|r| r.id() == id);
        self.reservations.retain(|_, held| match held {
            Reservation::Unbound(_) => true,
            Reservation::Arrival(id, _) => !cached(id.as_str()),
            Reservation::Removal(id, _) => cached(id.as_str()),
        });
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }
}
