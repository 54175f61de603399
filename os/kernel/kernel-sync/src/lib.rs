//! # Kernel synchronization primitives
//!
//! Two lock domains exist while resolving addresses: the per-address-space
//! page-table lock held across a table walk, and the result queue lock held
//! across a list splice. Both are short, non-sleeping critical sections and
//! use [`SpinLock`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;

pub use spin_lock::{SpinLock, SpinLockGuard};
