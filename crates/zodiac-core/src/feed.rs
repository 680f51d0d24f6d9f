use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Reverse;

use crate::accounts::Profile;
use crate::error::Result;
use crate::ledger::AccountLedger;
use crate::likes::{entry_id, Likes};
use crate::storage;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub entry_id: String,
    pub email: String,
    pub display_name: String,
    pub text: String,
    pub date: NaiveDate,
    pub image: String,
    pub solve_points: u32,
    pub upload_points: u32,
    pub total_points: u32,
    pub streak: u32,
    /// Like count at read time. `list` leaves it at 0; see [`count_likes`].
    pub likes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedOrder {
    #[default]
    Recent,
    MostLiked,
}

/// Every photo-backed deed across all accounts, in profile then history order.
pub fn list<F>(profiles: &[Profile], mut ledger_of: F) -> Vec<FeedEntry>
where
    F: FnMut(&Profile) -> AccountLedger,
{
    let mut entries = Vec::new();
    for profile in profiles {
        let ledger = ledger_of(profile);
        for deed in ledger.past_deeds {
            let Some(image) = deed.image.filter(|img| !img.is_empty()) else {
                continue;
            };
            entries.push(FeedEntry {
                entry_id: entry_id(&profile.email, deed.date),
                email: profile.email.clone(),
                display_name: profile.display_name().to_string(),
                text: deed.text,
                date: deed.date,
                image,
                solve_points: deed.solve_points,
                upload_points: deed.upload_points,
                total_points: deed.total_points,
                streak: deed.streak_at_completion,
                likes: 0,
            });
        }
    }
    entries
}

pub fn from_store<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<FeedEntry>> {
    let profiles = storage::load_profiles(store)?;
    let mut ledgers = Vec::with_capacity(profiles.len());
    for profile in &profiles {
        ledgers.push(storage::load_ledger(store, &profile.email)?);
    }
    let mut ledgers = ledgers.into_iter();
    let mut entries = list(&profiles, |_| ledgers.next().unwrap_or_default());
    count_likes(&mut entries, &storage::load_likes(store)?);
    Ok(entries)
}

pub fn count_likes(entries: &mut [FeedEntry], likes: &Likes) {
    for entry in entries {
        entry.likes = likes.count(&entry.entry_id);
    }
}

pub fn sort_feed(entries: &mut [FeedEntry], order: FeedOrder, likes: &Likes) {
    match order {
        FeedOrder::Recent => entries.sort_by_key(|e| Reverse(e.date)),
        FeedOrder::MostLiked => {
            entries.sort_by_key(|e| (Reverse(likes.count(&e.entry_id)), Reverse(e.date)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::Theme;
    use crate::ledger::Deed;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn profile(email: &str) -> Profile {
        Profile {
            email: email.into(),
            password_hash: String::new(),
            username: email.split('@').next().unwrap().to_uppercase(),
            birthday: day(1),
            theme: Theme::Light,
        }
    }

    fn deed(d: u32, image: Option<&str>) -> Deed {
        Deed {
            date: day(d),
            text: format!("deed {d}"),
            solve_points: 6,
            upload_points: if image.is_some() { 6 } else { 0 },
            total_points: if image.is_some() { 12 } else { 6 },
            streak_at_completion: 1,
            image: image.map(str::to_string),
        }
    }

    fn sample() -> Vec<FeedEntry> {
        let profiles = vec![profile("a@x.com"), profile("b@x.com")];
        list(&profiles, |p| match p.email.as_str() {
            "a@x.com" => AccountLedger {
                past_deeds: vec![deed(3, Some("img-a3")), deed(2, None), deed(1, Some(""))],
                ..Default::default()
            },
            _ => AccountLedger {
                past_deeds: vec![deed(5, Some("img-b5")), deed(4, Some("img-b4"))],
                ..Default::default()
            },
        })
    }

    #[test]
    fn only_photo_backed_deeds_are_listed() {
        let entries = sample();
        let ids: Vec<_> = entries.iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["a@x.com_2024-06-03", "b@x.com_2024-06-05", "b@x.com_2024-06-04"]
        );
        assert_eq!(entries[0].display_name, "A");
        assert_eq!(entries[0].total_points, 12);
    }

    #[test]
    fn most_liked_breaks_ties_by_recency() {
        let mut entries = sample();
        let mut likes = Likes::default();
        likes.toggle("b@x.com_2024-06-04", "u1");
        likes.toggle("a@x.com_2024-06-03", "u1");
        likes.toggle("a@x.com_2024-06-03", "u2");
        sort_feed(&mut entries, FeedOrder::MostLiked, &likes);
        let dates: Vec<_> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(3), day(4), day(5)]);

        sort_feed(&mut entries, FeedOrder::Recent, &likes);
        let dates: Vec<_> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(5), day(4), day(3)]);
    }

    #[test]
    fn from_store_carries_like_counts() {
        use crate::store::MemoryStore;

        let store = MemoryStore::new();
        storage::save_profiles(&store, &[profile("a@x.com")]).unwrap();
        let ledger = AccountLedger {
            past_deeds: vec![deed(3, Some("img-a3")), deed(2, Some("img-a2"))],
            ..Default::default()
        };
        storage::save_ledger(&store, "a@x.com", &ledger).unwrap();
        let mut likes = Likes::default();
        likes.toggle("a@x.com_2024-06-02", "u1");
        likes.toggle("a@x.com_2024-06-02", "u2");
        storage::save_likes(&store, &likes).unwrap();

        let entries = from_store(&store).unwrap();
        let counts: Vec<_> = entries.iter().map(|e| (e.date, e.likes)).collect();
        assert_eq!(counts, vec![(day(3), 0), (day(2), 2)]);
    }
}
