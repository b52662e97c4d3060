// ── Entity registry ──
//
// Radios, access points and endpoints known to this process, each with
// its action bitset. Owned by the `Manager`; nothing here is global.

use std::fmt;

use dashmap::DashMap;

use crate::driver::CommitRequest;
use crate::error::CoreError;
use crate::fsm::{BitActionSet, CommitBits, FsmAttribute};
use crate::model::{AccessPointRecord, EndpointRecord, EntityKind, RadioRecord};

/// A record plus the bits of its edits not yet committed.
#[derive(Debug, Clone)]
pub struct Entity<R> {
    pub record: R,
    pub actions: BitActionSet,
}

impl<R> Entity<R> {
    fn new(record: R) -> Self {
        Self {
            record,
            actions: BitActionSet::new(),
        }
    }
}

#[derive(Default)]
pub struct Registry {
    radios: DashMap<String, Entity<RadioRecord>>,
    access_points: DashMap<String, Entity<AccessPointRecord>>,
    endpoints: DashMap<String, Entity<EndpointRecord>>,
    /// SSID → alias of the AP broadcasting it.
    ssids: DashMap<String, String>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("radios", &self.radios.len())
            .field("access_points", &self.access_points.len())
            .field("endpoints", &self.endpoints.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Radios ───────────────────────────────────────────────────────

    pub fn add_radio(&self, record: RadioRecord) {
        self.radios.insert(record.name.clone(), Entity::new(record));
    }

    /// Remove a radio and everything on it.
    pub fn remove_radio(&self, name: &str) -> Option<RadioRecord> {
        let aps: Vec<String> = self.access_points_of(name);
        for alias in aps {
            self.remove_access_point(&alias);
        }
        self.endpoints.retain(|_, ep| ep.record.radio != name);
        self.radios.remove(name).map(|(_, e)| e.record)
    }

    pub fn radio(&self, name: &str) -> Option<RadioRecord> {
        self.radios.get(name).map(|e| e.record.clone())
    }

    pub fn radio_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.radios.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Mutate a radio record in place.
    pub fn update_radio<T>(&self, name: &str, f: impl FnOnce(&mut RadioRecord) -> T) -> Result<T, CoreError> {
        let mut entry = self
            .radios
            .get_mut(name)
            .ok_or_else(|| CoreError::not_found("radio", name))?;
        Ok(f(&mut entry.record))
    }

    // ── Access points ────────────────────────────────────────────────

    /// Register an AP. Its SSID must not already be served by another AP.
    pub fn add_access_point(&self, record: AccessPointRecord) -> Result<(), CoreError> {
        if !self.radios.contains_key(&record.radio) {
            return Err(CoreError::not_found("radio", record.radio.as_str()));
        }
        self.claim_ssid(&record.ssid, &record.alias)?;
        self.access_points.insert(record.alias.clone(), Entity::new(record));
        Ok(())
    }

    pub fn remove_access_point(&self, alias: &str) -> Option<AccessPointRecord> {
        let (_, entity) = self.access_points.remove(alias)?;
        self.ssids.remove_if(&entity.record.ssid, |_, owner| owner == alias);
        Some(entity.record)
    }

    pub fn access_point(&self, alias: &str) -> Option<AccessPointRecord> {
        self.access_points.get(alias).map(|e| e.record.clone())
    }

    pub fn access_points_of(&self, radio: &str) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .access_points
            .iter()
            .filter(|e| e.record.radio == radio)
            .map(|e| e.key().clone())
            .collect();
        aliases.sort();
        aliases
    }

    /// Mutate an AP record; a changed SSID is re-checked for uniqueness.
    pub fn update_access_point<T>(&self, alias: &str, f: impl FnOnce(&mut AccessPointRecord) -> T) -> Result<T, CoreError> {
        let mut entry = self
            .access_points
            .get_mut(alias)
            .ok_or_else(|| CoreError::not_found("access point", alias))?;
        let mut updated = entry.record.clone();
        let out = f(&mut updated);
        if updated.ssid != entry.record.ssid {
            self.claim_ssid(&updated.ssid, alias)?;
            self.ssids.remove_if(&entry.record.ssid, |_, owner| owner == alias);
        }
        entry.record = updated;
        Ok(out)
    }

    /// Alias of the AP serving `ssid`.
    pub fn ssid_owner(&self, ssid: &str) -> Option<String> {
        self.ssids.get(ssid).map(|owner| owner.clone())
    }

    fn claim_ssid(&self, ssid: &str, alias: &str) -> Result<(), CoreError> {
        let owner = self
            .ssids
            .entry(ssid.to_owned())
            .or_insert_with(|| alias.to_owned());
        if owner.as_str() == alias {
            Ok(())
        } else {
            Err(CoreError::InvalidArgument {
                field: "ssid".into(),
                reason: format!("'{ssid}' is already served by {}", owner.as_str()),
            })
        }
    }

    // ── Endpoints ────────────────────────────────────────────────────

    pub fn add_endpoint(&self, record: EndpointRecord) -> Result<(), CoreError> {
        if !self.radios.contains_key(&record.radio) {
            return Err(CoreError::not_found("radio", record.radio.as_str()));
        }
        self.endpoints.insert(record.alias.clone(), Entity::new(record));
        Ok(())
    }

    pub fn endpoint(&self, alias: &str) -> Option<EndpointRecord> {
        self.endpoints.get(alias).map(|e| e.record.clone())
    }

    pub fn endpoints_of(&self, radio: &str) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .endpoints
            .iter()
            .filter(|e| e.record.radio == radio)
            .map(|e| e.key().clone())
            .collect();
        aliases.sort();
        aliases
    }

    // ── Action bits ──────────────────────────────────────────────────

    /// Mark `attr` changed on entity `name`. Returns the radio the entity
    /// belongs to.
    pub fn mark<A: FsmAttribute>(&self, name: &str, attr: A) -> Result<String, CoreError> {
        let bit = attr.bit();
        match A::KIND {
            EntityKind::Radio => {
                let mut entry = self
                    .radios
                    .get_mut(name)
                    .ok_or_else(|| CoreError::not_found("radio", name))?;
                entry.actions.mark(bit);
                Ok(entry.record.name.clone())
            }
            EntityKind::AccessPoint => {
                let mut entry = self
                    .access_points
                    .get_mut(name)
                    .ok_or_else(|| CoreError::not_found("access point", name))?;
                entry.actions.mark(bit);
                Ok(entry.record.radio.clone())
            }
            EntityKind::Endpoint => {
                let mut entry = self
                    .endpoints
                    .get_mut(name)
                    .ok_or_else(|| CoreError::not_found("endpoint", name))?;
                entry.actions.mark(bit);
                Ok(entry.record.radio.clone())
            }
        }
    }

    /// Force a full resync of a radio on its next commit.
    pub fn mark_sync_all(&self, radio: &str) -> Result<(), CoreError> {
        let mut entry = self
            .radios
            .get_mut(radio)
            .ok_or_else(|| CoreError::not_found("radio", radio))?;
        entry.actions.mark_sync_all();
        Ok(())
    }

    /// The radio or any entity on it has significant pending bits.
    pub fn has_significant_pending(&self, radio: &str, threshold: usize) -> bool {
        let radio_pending = self
            .radios
            .get(radio)
            .is_some_and(|e| e.actions.has_significant_pending(threshold));
        radio_pending
            || self
                .access_points
                .iter()
                .any(|e| e.record.radio == radio && e.actions.has_significant_pending(threshold))
            || self
                .endpoints
                .iter()
                .any(|e| e.record.radio == radio && e.actions.has_significant_pending(threshold))
    }

    /// A commit on the radio or any entity on it awaits confirmation.
    pub fn is_commit_pending(&self, radio: &str) -> bool {
        self.radios.get(radio).is_some_and(|e| e.actions.is_committing())
            || self
                .access_points
                .iter()
                .any(|e| e.record.radio == radio && e.actions.is_committing())
            || self
                .endpoints
                .iter()
                .any(|e| e.record.radio == radio && e.actions.is_committing())
    }

    /// Snapshot and move every pending bit on the radio into flight.
    pub fn begin_commit(&self, radio: &str) -> Result<CommitRequest, CoreError> {
        let radio_bits = {
            let mut entry = self
                .radios
                .get_mut(radio)
                .ok_or_else(|| CoreError::not_found("radio", radio))?;
            entry.actions.begin_commit()
        };
        let collect = |bits: &mut Vec<(String, CommitBits)>, name: &str, actions: &mut BitActionSet| {
            bits.push((name.to_owned(), actions.begin_commit()));
        };

        let mut request = CommitRequest {
            radio: radio.to_owned(),
            radio_bits,
            ..CommitRequest::default()
        };
        for mut entry in self.access_points.iter_mut().filter(|e| e.record.radio == radio) {
            let (alias, entity) = entry.pair_mut();
            collect(&mut request.access_points, alias, &mut entity.actions);
        }
        for mut entry in self.endpoints.iter_mut().filter(|e| e.record.radio == radio) {
            let (alias, entity) = entry.pair_mut();
            collect(&mut request.endpoints, alias, &mut entity.actions);
        }
        request.access_points.sort_by(|a, b| a.0.cmp(&b.0));
        request.endpoints.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(request)
    }

    pub fn end_commit(&self, radio: &str) {
        self.for_each_actions(radio, BitActionSet::end_commit);
    }

    pub fn abort_commit(&self, radio: &str) {
        self.for_each_actions(radio, BitActionSet::abort_commit);
    }

    fn for_each_actions(&self, radio: &str, f: impl Fn(&mut BitActionSet)) {
        if let Some(mut entry) = self.radios.get_mut(radio) {
            f(&mut entry.actions);
        }
        for mut entry in self.access_points.iter_mut() {
            if entry.record.radio == radio {
                f(&mut entry.actions);
            }
        }
        for mut entry in self.endpoints.iter_mut() {
            if entry.record.radio == radio {
                f(&mut entry.actions);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fsm::{ApAttr, RadioAttr};
    use crate::model::{Band, Bandwidth, ChannelSpec};

    fn registry() -> Registry {
        let registry = Registry::new();
        registry.add_radio(RadioRecord::new("wifi0", ChannelSpec::new(Band::Ghz5, 36, Bandwidth::Mhz80)));
        registry
            .add_access_point(AccessPointRecord::new("wlan0", "wifi0", "HomeNet"))
            .unwrap();
        registry
    }

    #[test]
    fn duplicate_ssid_is_rejected() {
        let registry = registry();
        let err = registry
            .add_access_point(AccessPointRecord::new("wlan1", "wifi0", "HomeNet"))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
        assert_eq!(registry.ssid_owner("HomeNet").as_deref(), Some("wlan0"));
    }

    #[test]
    fn ssid_rename_moves_ownership() {
        let registry = registry();
        registry
            .update_access_point("wlan0", |ap| ap.ssid = "Renamed".into())
            .unwrap();
        assert_eq!(registry.ssid_owner("HomeNet"), None);
        assert_eq!(registry.ssid_owner("Renamed").as_deref(), Some("wlan0"));
    }

    #[test]
    fn ap_on_unknown_radio_is_not_found() {
        let registry = registry();
        let err = registry
            .add_access_point(AccessPointRecord::new("wlan9", "wifi9", "Other"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn mark_resolves_owning_radio() {
        let registry = registry();
        assert_eq!(registry.mark("wlan0", ApAttr::Ssid).unwrap(), "wifi0");
        assert_eq!(registry.mark("wifi0", RadioAttr::Channel).unwrap(), "wifi0");
        assert!(registry.mark("wlan7", ApAttr::Ssid).unwrap_err().is_not_found());
    }

    #[test]
    fn commit_collects_children() {
        let registry = registry();
        registry.mark("wlan0", ApAttr::Ssid).unwrap();
        assert!(registry.has_significant_pending("wifi0", 0));

        let request = registry.begin_commit("wifi0").unwrap();

        assert!(request.radio_bits.is_empty());
        assert_eq!(request.access_points.len(), 1);
        assert!(request.access_points[0].1.bits.test(ApAttr::Ssid.bit()));
        assert!(registry.is_commit_pending("wifi0"));

        registry.end_commit("wifi0");
        assert!(!registry.is_commit_pending("wifi0"));
        assert!(!registry.has_significant_pending("wifi0", 0));
    }

    #[test]
    fn remove_radio_drops_children() {
        let registry = registry();
        registry.remove_radio("wifi0").unwrap();
        assert!(registry.access_point("wlan0").is_none());
        assert_eq!(registry.ssid_owner("HomeNet"), None);
    }
}
