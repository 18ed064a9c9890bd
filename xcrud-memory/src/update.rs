//! Path lookups and in-place document updates.
//!
//! Paths are the parsed segments of a `Field` without wildcards. Missing
//! intermediate members are created by `set` and ignored by every other
//! operation, so an update that does not apply leaves the document unchanged.

use bson::{Bson, Document};
use std::mem;

use xcrud_core::value::PathSegment;

enum Container<'a> {
    Doc(&'a mut Document),
    Array(&'a mut Vec<Bson>),
}

/// Returns the value at `path`, if there is one.
pub(crate) fn lookup<'a>(doc: &'a Document, path: &[PathSegment]) -> Option<&'a Bson> {
    let (first, rest) = path.split_first()?;
    let mut current = match first {
        PathSegment::Member(name) => doc.get(name)?,
        _ => return None,
    };

    for segment in rest {
        current = match (segment, current) {
            (PathSegment::Member(name), Bson::Document(inner)) => inner.get(name)?,
            (PathSegment::Index(index), Bson::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }

    Some(current)
}

fn container_mut<'a>(doc: &'a mut Document, parents: &[PathSegment], create: bool) -> Option<Container<'a>> {
    let mut container = Container::Doc(doc);

    for segment in parents {
        let child = match (container, segment) {
            (Container::Doc(inner), PathSegment::Member(name)) => {
                if create && !inner.contains_key(name) {
                    inner.insert(name.clone(), Document::new());
                }
                inner.get_mut(name)?
            }
            (Container::Array(items), PathSegment::Index(index)) => items.get_mut(*index)?,
            _ => return None,
        };

        container = match child {
            Bson::Document(inner) => Container::Doc(inner),
            Bson::Array(items) => Container::Array(items),
            _ => return None,
        };
    }

    Some(container)
}

fn target_mut<'a>(doc: &'a mut Document, path: &[PathSegment]) -> Option<&'a mut Bson> {
    let (last, parents) = path.split_last()?;
    match (container_mut(doc, parents, false)?, last) {
        (Container::Doc(inner), PathSegment::Member(name)) => inner.get_mut(name),
        (Container::Array(items), PathSegment::Index(index)) => items.get_mut(*index),
        _ => None,
    }
}

/// Writes `value` at `path`. An index past the end of an array appends.
pub(crate) fn set(doc: &mut Document, path: &[PathSegment], value: Bson) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    match (container_mut(doc, parents, true), last) {
        (Some(Container::Doc(inner)), PathSegment::Member(name)) => {
            inner.insert(name.clone(), value);
        }
        (Some(Container::Array(items)), PathSegment::Index(index)) => {
            if *index < items.len() {
                items[*index] = value;
            } else {
                items.push(value);
            }
        }
        _ => {}
    }
}

/// Removes the member or array element at `path`.
pub(crate) fn unset(doc: &mut Document, path: &[PathSegment]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    match (container_mut(doc, parents, false), last) {
        (Some(Container::Doc(inner)), PathSegment::Member(name)) => {
            inner.remove(name);
        }
        (Some(Container::Array(items)), PathSegment::Index(index)) if *index < items.len() => {
            items.remove(*index);
        }
        _ => {}
    }
}

/// Inserts `value` before the array element at `path`, or at the end if the index is past it.
pub(crate) fn array_insert(doc: &mut Document, path: &[PathSegment], value: Bson) {
    let Some((PathSegment::Index(index), parents)) = path.split_last() else {
        return;
    };

    if let Some(Container::Array(items)) = container_mut(doc, parents, false) {
        let at = (*index).min(items.len());
        items.insert(at, value);
    }
}

/// Appends `value` to the array at `path`. A scalar at `path` becomes a two element array.
pub(crate) fn array_append(doc: &mut Document, path: &[PathSegment], value: Bson) {
    match target_mut(doc, path) {
        Some(Bson::Array(items)) => items.push(value),
        Some(other) => {
            let previous = mem::replace(other, Bson::Null);
            *other = Bson::Array(vec![previous, value]);
        }
        None => {}
    }
}
