//! # Physical Page Locator
//!
//! Turns a page frame number into a referenced folio, but only for folios on
//! an LRU list. LRU membership is what makes a folio safe to hand to the
//! reverse map; everything else (offline frames, tail pages, slab and other
//! kernel-special pages) is outside what can be classified and yields `None`.

use core::fmt;
use kernel_memory_addresses::PageFrameNumber;
use log::{trace, warn};

/// Host page-descriptor database.
///
/// `Page` and `Folio` are the host's handles (typically pointers to its page
/// descriptors). They carry no ownership; references are taken explicitly
/// through [`try_get`](Self::try_get) and returned through [`put`](Self::put).
pub trait FrameDatabase {
    type Page: Copy;
    type Folio: Copy + PartialEq + fmt::Debug;

    /// The descriptor of `pfn`, if the frame is online.
    fn online_page(&self, pfn: PageFrameNumber) -> Option<Self::Page>;

    /// Whether `page` is a non-head page of a compound folio.
    fn is_tail(&self, page: Self::Page) -> bool;

    /// The folio `page` currently belongs to.
    fn folio_of(&self, page: Self::Page) -> Self::Folio;

    /// Whether `folio` is on an LRU list.
    fn is_on_lru(&self, folio: Self::Folio) -> bool;

    /// Take a reference unless the folio's count already dropped to zero.
    fn try_get(&self, folio: Self::Folio) -> bool;

    /// Drop a reference taken by [`try_get`](Self::try_get).
    fn put(&self, folio: Self::Folio);
}

/// A folio reference taken by [`locate`]. Dropping it puts the reference.
#[must_use = "dropping a FolioRef releases the folio immediately"]
pub struct FolioRef<'db, D: FrameDatabase + ?Sized> {
    db: &'db D,
    folio: D::Folio,
}

impl<D: FrameDatabase + ?Sized> FolioRef<'_, D> {
    /// The referenced folio.
    #[inline]
    #[must_use]
    pub fn folio(&self) -> D::Folio {
        self.folio
    }
}

impl<D: FrameDatabase + ?Sized> Drop for FolioRef<'_, D> {
    fn drop(&mut self) {
        trace!("put {:?}", self.folio);
        self.db.put(self.folio);
    }
}

impl<D: FrameDatabase + ?Sized> fmt::Debug for FolioRef<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FolioRef").field(&self.folio).finish()
    }
}

/// Look up the LRU folio headed by `pfn` and take a reference on it.
///
/// Returns `None` when the frame is offline, is a tail page, is not on an
/// LRU list, or its folio is being freed. A folio that changes identity or
/// leaves the LRU between the check and the reference is released again and
/// also yields `None`; nothing is retried.
#[must_use]
pub fn locate<D: FrameDatabase + ?Sized>(db: &D, pfn: PageFrameNumber) -> Option<FolioRef<'_, D>> {
    let Some(page) = db.online_page(pfn) else {
        trace!("{pfn:?} is not online");
        return None;
    };
    if db.is_tail(page) {
        trace!("{pfn:?} is a tail page");
        return None;
    }

    let folio = db.folio_of(page);
    if !db.is_on_lru(folio) || !db.try_get(folio) {
        trace!("{pfn:?}: {folio:?} is not an LRU folio");
        return None;
    }
    let folio = FolioRef { db, folio };

    if db.folio_of(page) != folio.folio() || !db.is_on_lru(folio.folio()) {
        warn!("{pfn:?}: {:?} changed while taking a reference", folio.folio());
        return None;
    }
    Some(folio)
}
