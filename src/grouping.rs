use crate::schema::{BusinessRecord, GroupField};
use std::collections::HashMap;

/// Derives the row key of a record.
///
/// Implemented by [`GroupField`] and by any `Fn(&BusinessRecord) -> String`,
/// so callers can group by derived values (e.g. "Location / Trainer").
pub trait GroupKeyFn {
    fn group_key(&self, record: &BusinessRecord) -> String;
}

impl GroupKeyFn for GroupField {
    fn group_key(&self, record: &BusinessRecord) -> String {
        match record.field(*self).map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => self.sentinel().to_string(),
        }
    }
}

impl<F> GroupKeyFn for F
where
    F: Fn(&BusinessRecord) -> String,
{
    fn group_key(&self, record: &BusinessRecord) -> String {
        self(record)
    }
}

#[derive(Debug, Clone)]
pub struct GroupBucket<'a> {
    pub key: String,
    pub records: Vec<&'a BusinessRecord>,
}

#[derive(Debug, Clone)]
pub struct NestedBucket<'a> {
    pub key: String,
    pub records: Vec<&'a BusinessRecord>,
    pub children: Vec<GroupBucket<'a>>,
}

/// Partitions `items` by key, keeping buckets in order of first occurrence.
pub(crate) fn partition<T, F>(items: impl IntoIterator<Item = T>, mut key: F) -> Vec<(String, Vec<T>)>
where
    F: FnMut(&T) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<(String, Vec<T>)> = Vec::new();

    for item in items {
        let k = key(&item);
        match index.get(&k) {
            Some(&pos) => buckets[pos].1.push(item),
            None => {
                index.insert(k.clone(), buckets.len());
                buckets.push((k, vec![item]));
            }
        }
    }

    buckets
}

pub fn group_records<'a, K>(
    records: impl IntoIterator<Item = &'a BusinessRecord>,
    key: &K,
) -> Vec<GroupBucket<'a>>
where
    K: GroupKeyFn + ?Sized,
{
    partition(records, |record| key.group_key(record))
        .into_iter()
        .map(|(key, records)| GroupBucket { key, records })
        .collect()
}

/// Two-level grouping, e.g. category then product within each category.
pub fn group_nested<'a, P, C>(
    records: impl IntoIterator<Item = &'a BusinessRecord>,
    parent: &P,
    child: &C,
) -> Vec<NestedBucket<'a>>
where
    P: GroupKeyFn + ?Sized,
    C: GroupKeyFn + ?Sized,
{
    group_records(records, parent)
        .into_iter()
        .map(|bucket| {
            let children = group_records(bucket.records.iter().copied(), child);
            NestedBucket {
                key: bucket.key,
                records: bucket.records,
                children,
            }
        })
        .collect()
}
