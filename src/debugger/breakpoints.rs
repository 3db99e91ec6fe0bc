//! Breakpoint store: breakpoints, their resolved locations, and id allocation.

use crate::error::{Error, Result};
use crate::target::ResolvedSite;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Session-unique breakpoint identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BreakpointId(pub u32);

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `(breakpoint, index)` pair; indices start at 1 within each breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationId {
    pub breakpoint: BreakpointId,
    pub index: u32,
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.breakpoint, self.index)
    }
}

/// What the user asked to stop on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointSpec {
    FileLine {
        file: Option<String>,
        line: u32,
        exact: bool,
    },
    Symbol {
        name: String,
    },
    Regex {
        pattern: String,
        files: Vec<String>,
    },
    SourceRegex {
        pattern: String,
        files: Vec<String>,
    },
}

impl fmt::Display for BreakpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakpointSpec::FileLine { file, line, exact } => write!(
                f,
                "file = '{}', line = {}, exact_match = {}",
                file.as_deref().unwrap_or("<default>"),
                line,
                u8::from(*exact)
            ),
            BreakpointSpec::Symbol { name } => write!(f, "name = '{}'", name),
            BreakpointSpec::Regex { pattern, .. } => write!(f, "regex = '{}'", pattern),
            BreakpointSpec::SourceRegex { pattern, .. } => {
                write!(f, "source regex = '{}'", pattern)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationState {
    Unresolved,
    Resolved,
}

#[derive(Debug, Clone)]
pub struct BreakpointLocation {
    pub id: LocationId,
    pub address: u64,
    pub module: String,
    pub function: String,
    pub offset: u64,
    pub file: String,
    pub line: u32,
    pub state: LocationState,
    pub hit_count: u32,
}

impl BreakpointLocation {
    pub fn is_resolved(&self) -> bool {
        self.state == LocationState::Resolved
    }
}

impl fmt::Display for BreakpointLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: where = {}`{} + {} at {}:{}, address = {:#018x}, {}, hit count = {}",
            self.id,
            self.module,
            self.function,
            self.offset,
            base_name(&self.file),
            self.line,
            self.address,
            if self.is_resolved() { "resolved" } else { "unresolved" },
            self.hit_count
        )
    }
}

pub(crate) fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[derive(Debug, Clone)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub spec: BreakpointSpec,
    locations: Vec<BreakpointLocation>,
    next_location: u32,
}

impl Breakpoint {
    fn new(id: BreakpointId, spec: BreakpointSpec) -> Self {
        Self {
            id,
            spec,
            locations: Vec::new(),
            next_location: 1,
        }
    }

    pub fn locations(&self) -> &[BreakpointLocation] {
        &self.locations
    }

    pub fn resolved_count(&self) -> usize {
        self.locations.iter().filter(|l| l.is_resolved()).count()
    }

    pub fn hit_count(&self) -> u32 {
        self.locations.iter().map(|l| l.hit_count).sum()
    }

    /// Attach newly discovered sites, skipping addresses already owned.
    fn add_sites(&mut self, sites: Vec<ResolvedSite>) -> usize {
        let mut added = 0;
        for site in sites {
            if self.locations.iter().any(|l| l.address == site.address) {
                continue;
            }
            let id = LocationId {
                breakpoint: self.id,
                index: self.next_location,
            };
            self.next_location += 1;
            self.locations.push(BreakpointLocation {
                id,
                address: site.address,
                module: site.module,
                function: site.function,
                offset: site.offset,
                file: site.file,
                line: site.line,
                state: LocationState::Unresolved,
                hit_count: 0,
            });
            added += 1;
        }
        added
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, locations = {}",
            self.id,
            self.spec,
            self.locations.len()
        )?;
        let resolved = self.resolved_count();
        if resolved > 0 {
            write!(f, ", resolved = {}", resolved)?;
        }
        write!(f, ", hit count = {}", self.hit_count())
    }
}

/// Owns every breakpoint of the session, keyed by id.
#[derive(Debug, Default)]
pub struct BreakpointStore {
    last_id: u32,
    breakpoints: BTreeMap<BreakpointId, Breakpoint>,
}

impl BreakpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, spec: BreakpointSpec) -> BreakpointId {
        self.last_id += 1;
        let id = BreakpointId(self.last_id);
        info!("Breakpoint {} created: {}", id, spec);
        self.breakpoints.insert(id, Breakpoint::new(id, spec));
        id
    }

    pub fn delete(&mut self, id: BreakpointId) -> Result<()> {
        match self.breakpoints.remove(&id) {
            Some(_) => {
                info!("Breakpoint {} deleted", id);
                Ok(())
            }
            None => Err(Error::NotFound(id)),
        }
    }

    pub fn delete_all(&mut self) -> usize {
        let count = self.breakpoints.len();
        self.breakpoints.clear();
        if count > 0 {
            info!("All breakpoints removed ({} breakpoints)", count);
        }
        count
    }

    pub fn find(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoints.get(&id)
    }

    pub fn contains(&self, id: BreakpointId) -> bool {
        self.breakpoints.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<BreakpointId> {
        self.breakpoints.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    pub fn add_locations(&mut self, id: BreakpointId, sites: Vec<ResolvedSite>) -> Result<usize> {
        let bp = self.breakpoints.get_mut(&id).ok_or(Error::NotFound(id))?;
        let added = bp.add_sites(sites);
        if added > 0 {
            debug!("Breakpoint {} gained {} location(s)", id, added);
        }
        Ok(added)
    }

    pub fn location(&self, id: LocationId) -> Option<&BreakpointLocation> {
        self.breakpoints
            .get(&id.breakpoint)?
            .locations
            .iter()
            .find(|l| l.id == id)
    }

    pub fn resolved_locations(&self, id: BreakpointId) -> Result<Vec<&BreakpointLocation>> {
        let bp = self.find(id).ok_or(Error::NotFound(id))?;
        Ok(bp.locations.iter().filter(|l| l.is_resolved()).collect())
    }

    /// Resolved locations at `address`, in breakpoint id order.
    pub fn locations_at(&self, address: u64) -> Vec<LocationId> {
        self.breakpoints
            .values()
            .flat_map(|bp| bp.locations.iter())
            .filter(|l| l.address == address && l.is_resolved())
            .map(|l| l.id)
            .collect()
    }

    pub fn record_hit(&mut self, id: LocationId) -> Result<u32> {
        let bp = self
            .breakpoints
            .get_mut(&id.breakpoint)
            .ok_or(Error::NotFound(id.breakpoint))?;
        let loc = bp
            .locations
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(Error::NotFound(id.breakpoint))?;
        loc.hit_count += 1;
        Ok(loc.hit_count)
    }

    pub fn set_module_state(&mut self, module: &str, state: LocationState) {
        for loc in self
            .breakpoints
            .values_mut()
            .flat_map(|bp| bp.locations.iter_mut())
            .filter(|l| l.module == module)
        {
            loc.state = state;
        }
    }

    pub fn unresolve_all(&mut self) {
        for loc in self
            .breakpoints
            .values_mut()
            .flat_map(|bp| bp.locations.iter_mut())
        {
            loc.state = LocationState::Unresolved;
        }
    }

    /// Addresses the inferior must trap on.
    pub fn site_addresses(&self) -> BTreeSet<u64> {
        self.breakpoints
            .values()
            .flat_map(|bp| bp.locations.iter())
            .filter(|l| l.is_resolved())
            .map(|l| l.address)
            .collect()
    }
}
