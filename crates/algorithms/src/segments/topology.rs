//! Network filtering
//!
//! Removing a segment re-links its retained upstream segments to the first
//! retained segment below it, so every kept segment still drains along a
//! valid chain. Indices are repacked to 0..N'-1 and ids are preserved.
//! Re-linking can join more than two segments at one confluence, which is
//! then split into new junction segments.

use super::Segments;
use burnflow_core::Result;
use tracing::debug;

impl Segments {
    /// Keep the segments flagged true, one flag per segment
    pub fn keep(&mut self, keep: &[bool]) -> Result<()> {
        self.check_length("keep", keep.len())?;
        self.retain(keep);
        Ok(())
    }

    /// Remove the segments flagged true, one flag per segment
    pub fn remove(&mut self, remove: &[bool]) -> Result<()> {
        self.check_length("remove", remove.len())?;
        let keep: Vec<bool> = remove.iter().map(|r| !r).collect();
        self.retain(&keep);
        Ok(())
    }

    /// Keep the segments at the given indices
    pub fn keep_indices(&mut self, indices: &[usize]) -> Result<()> {
        let keep = self.flags(indices)?;
        self.retain(&keep);
        Ok(())
    }

    /// Remove the segments at the given indices
    pub fn remove_indices(&mut self, indices: &[usize]) -> Result<()> {
        let keep: Vec<bool> = self.flags(indices)?.into_iter().map(|f| !f).collect();
        self.retain(&keep);
        Ok(())
    }

    /// Select the segments of `mask` that keep flow continuity.
    ///
    /// A selected segment qualifies when it is a terminal outlet, or when
    /// the first selected segment below it qualifies. Equivalently, the
    /// segment and the terminal outlet of its network are both selected.
    /// Passing the result to [`Segments::keep`] never leaves retained
    /// segments draining into a removed outlet.
    pub fn continuous(&self, mask: &[bool]) -> Result<Vec<bool>> {
        self.check_length("mask", mask.len())?;
        let root = self.roots();
        Ok((0..self.len()).map(|i| mask[i] && mask[root[i]]).collect())
    }

    /// Terminal outlet index of every segment's network
    fn roots(&self) -> Vec<usize> {
        let n = self.len();
        let mut root: Vec<Option<usize>> = vec![None; n];
        for start in 0..n {
            if root[start].is_some() {
                continue;
            }
            let mut path = vec![start];
            let mut current = start;
            let found = loop {
                if let Some(r) = root[current] {
                    break r;
                }
                match self.child[current] {
                    c if c < 0 => break current,
                    c => {
                        current = c as usize;
                        path.push(current);
                    }
                }
            };
            for i in path {
                root[i] = Some(found);
            }
        }
        root.into_iter().enumerate().map(|(i, r)| r.unwrap_or(i)).collect()
    }

    fn flags(&self, indices: &[usize]) -> Result<Vec<bool>> {
        let mut flags = vec![false; self.len()];
        for &i in indices {
            self.check_index(i)?;
            flags[i] = true;
        }
        Ok(flags)
    }

    /// Drop unflagged segments and repack the topology
    fn retain(&mut self, keep: &[bool]) {
        let n = self.len();
        let mut index = vec![None; n];
        let mut next = 0;
        for i in 0..n {
            if keep[i] {
                index[i] = Some(next);
                next += 1;
            }
        }

        let terminals = self.terminal_ids();

        // First retained segment below each retained segment
        let mut child = Vec::with_capacity(next);
        for i in (0..n).filter(|&i| keep[i]) {
            let mut c = self.child[i];
            while c >= 0 && !keep[c as usize] {
                c = self.child[c as usize];
            }
            child.push(if c < 0 { -1 } else { index[c as usize].map_or(-1, |k| k as isize) });
        }

        let mut parents = vec![Vec::new(); next];
        for (i, &c) in child.iter().enumerate() {
            if c >= 0 {
                parents[c as usize].push(i);
            }
        }

        self.pixels = select(std::mem::take(&mut self.pixels), keep);
        self.lines = select(std::mem::take(&mut self.lines), keep);
        self.ids = select(std::mem::take(&mut self.ids), keep);
        self.child = child;
        self.parents = parents;
        self.split_confluences();

        if self.terminal_ids() != terminals {
            self.basins = None;
        }
        debug!(before = n, after = self.len(), "filtered stream segments");
    }
}

fn select<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, &k)| k.then_some(item))
        .collect()
}
