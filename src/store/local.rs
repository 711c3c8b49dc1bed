use pipeline_common::{Deal, DealId};

/// Session-side copy of the authoritative deal list.
///
/// Only confirmed store results are written here, so a failed create or
/// update can never leak into what the board is computed from.
#[derive(Debug, Clone, Default)]
pub struct DealList {
    deals: Vec<Deal>,
}

impl DealList {
    pub fn new(deals: Vec<Deal>) -> Self {
        Self { deals }
    }

    pub fn as_slice(&self) -> &[Deal] {
        &self.deals
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    pub fn get(&self, id: DealId) -> Option<&Deal> {
        self.deals.iter().find(|d| d.id == id)
    }

    pub fn replace_all(&mut self, deals: Vec<Deal>) {
        self.deals = deals;
    }

    /// Replace the record with the same id in place, or append it.
    pub fn upsert(&mut self, deal: Deal) {
        match self.deals.iter_mut().find(|d| d.id == deal.id) {
            Some(existing) => *existing = deal,
            None => self.deals.push(deal),
        }
    }

    pub fn remove(&mut self, id: DealId) -> Option<Deal> {
        let index = self.deals.iter().position(|d| d.id == id)?;
        Some(self.deals.remove(index))
    }
}
