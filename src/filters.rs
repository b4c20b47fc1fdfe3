use crate::error::AppError;

use std::collections::BTreeSet;
use uuid::Uuid;

pub const ALL_CAMPAIGNS: &str = "all";

/// Which campaigns the dashboard is restricted to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CampaignSelection {
    #[default]
    All,
    Only(BTreeSet<Uuid>),
}

impl CampaignSelection {
    /// Parse a list of ids as sent by the client. Any `"all"` entry, or an empty list,
    /// disables filtering.
    pub fn parse<'a, I>(ids: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut selected = BTreeSet::new();
        for raw in ids {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            if raw == ALL_CAMPAIGNS {
                return Ok(CampaignSelection::All);
            }
            let id = Uuid::parse_str(raw)
                .map_err(|_| AppError::validation(format!("invalid campaign id: {raw}")))?;
            selected.insert(id);
        }
        Ok(Self::from_set(selected))
    }

    /// Comma separated form used in query strings.
    pub fn parse_csv(csv: Option<&str>) -> Result<Self, AppError> {
        match csv {
            Some(csv) => Self::parse(csv.split(',')),
            None => Ok(CampaignSelection::All),
        }
    }

    fn from_set(ids: BTreeSet<Uuid>) -> Self {
        if ids.is_empty() {
            CampaignSelection::All
        } else {
            CampaignSelection::Only(ids)
        }
    }

    /// Ids to filter by, or `None` when every campaign is selected.
    pub fn ids(&self) -> Option<Vec<Uuid>> {
        match self {
            CampaignSelection::All => None,
            CampaignSelection::Only(ids) => Some(ids.iter().copied().collect()),
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        match self {
            CampaignSelection::All => true,
            CampaignSelection::Only(ids) => ids.contains(id),
        }
    }

    /// Checking one campaign drops "all"; unchecking the last one falls back to "all".
    pub fn toggle(self, id: Uuid) -> Self {
        let mut ids = match self {
            CampaignSelection::All => BTreeSet::new(),
            CampaignSelection::Only(ids) => ids,
        };
        if !ids.remove(&id) {
            ids.insert(id);
        }
        Self::from_set(ids)
    }

    /// Button label for the filter dropdown.
    pub fn label<'a>(&self, name_of: impl Fn(&Uuid) -> Option<&'a str>) -> String {
        match self {
            CampaignSelection::All => "All Campaigns".to_string(),
            CampaignSelection::Only(ids) if ids.len() == 1 => ids
                .iter()
                .next()
                .and_then(name_of)
                .unwrap_or("Select campaigns")
                .to_string(),
            CampaignSelection::Only(ids) => format!("{} campaigns selected", ids.len()),
        }
    }
}

/// Case-insensitive substring match on campaign names.
pub fn search_campaigns<'a, T>(campaigns: &'a [T], query: &str, name: impl Fn(&T) -> &str) -> Vec<&'a T> {
    let query = query.to_lowercase();
    campaigns
        .iter()
        .filter(|c| name(*c).to_lowercase().contains(&query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sentinel_wins() {
        let id = Uuid::new_v4().to_string();
        let sel = CampaignSelection::parse([id.as_str(), "all"]).unwrap();
        assert_eq!(sel, CampaignSelection::All);
        assert_eq!(sel.ids(), None);
        assert_eq!(CampaignSelection::parse_csv(Some("")).unwrap(), CampaignSelection::All);
        assert_eq!(CampaignSelection::parse_csv(None).unwrap(), CampaignSelection::All);
    }

    #[test]
    fn bad_id_is_a_validation_error() {
        let err = CampaignSelection::parse_csv(Some("nope")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn toggling_falls_back_to_all() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let sel = CampaignSelection::All.toggle(a);
        assert!(sel.contains(&a));
        assert!(!sel.contains(&b));
        let sel = sel.toggle(b);
        assert_eq!(sel.ids().map(|v| v.len()), Some(2));
        let sel = sel.toggle(a).toggle(b);
        assert_eq!(sel, CampaignSelection::All);
    }

    #[test]
    fn labels() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let names = |id: &Uuid| if *id == a { Some("Spring outreach") } else { None };
        assert_eq!(CampaignSelection::All.label(names), "All Campaigns");
        assert_eq!(CampaignSelection::All.toggle(a).label(names), "Spring outreach");
        assert_eq!(CampaignSelection::All.toggle(b).label(names), "Select campaigns");
        assert_eq!(
            CampaignSelection::All.toggle(a).toggle(b).label(names),
            "2 campaigns selected"
        );
    }

    #[test]
    fn search_is_case_insensitive() {
        let names = vec!["Spring Outreach".to_string(), "Renewals".to_string()];
        let hits = search_campaigns(&names, "OUT", |n| n.as_str());
        assert_eq!(hits, vec![&names[0]]);
        assert_eq!(search_campaigns(&names, "", |n| n.as_str()).len(), 2);
    }
}
