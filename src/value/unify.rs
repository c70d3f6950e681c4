//! Finding a single type that a group of values can all convert to.

use indexmap::IndexMap;

use super::Type;

/// Returns the most specific type every input type converts to, or `None`
/// when no such type exists.
pub fn unify(types: &[Type]) -> Option<Type> {
    let Some(first) = types.first() else {
        return Some(Type::Dynamic);
    };
    if types.iter().all(|t| t == first) {
        return Some(first.clone());
    }
    if types.iter().any(Type::is_dynamic) {
        return Some(Type::Dynamic);
    }
    if types.iter().all(Type::is_primitive) {
        // mixed primitives meet at string
        return Some(Type::String);
    }
    if types.iter().all(|t| matches!(t, Type::List(_))) {
        return unify_elements(types).map(Type::list);
    }
    if types.iter().all(|t| matches!(t, Type::Set(_))) {
        return unify_elements(types).map(Type::set);
    }
    if types
        .iter()
        .all(|t| matches!(t, Type::Map(_) | Type::Object(_)))
    {
        return unify_mappings(types);
    }
    if types
        .iter()
        .all(|t| matches!(t, Type::Tuple(_) | Type::List(_)))
    {
        return unify_sequences(types);
    }
    None
}

fn unify_elements(types: &[Type]) -> Option<Type> {
    let elements: Vec<Type> = types
        .iter()
        .filter_map(|t| t.element_type().cloned())
        .collect();
    unify(&elements)
}

fn unify_mappings(types: &[Type]) -> Option<Type> {
    let objects: Vec<&IndexMap<String, Type>> = types
        .iter()
        .filter_map(|t| match t {
            Type::Object(attrs) => Some(attrs),
            _ => None,
        })
        .collect();

    // Objects with identical attribute names stay objects.
    if objects.len() == types.len() {
        let names = objects[0];
        let same_shape = objects
            .iter()
            .all(|o| o.len() == names.len() && o.keys().all(|k| names.contains_key(k)));
        if same_shape {
            let mut attrs = IndexMap::new();
            for name in names.keys() {
                let candidates: Vec<Type> = objects
                    .iter()
                    .filter_map(|o| o.get(name).cloned())
                    .collect();
                attrs.insert(name.clone(), unify(&candidates)?);
            }
            return Some(Type::Object(attrs));
        }
    }

    let mut elements = Vec::new();
    for t in types {
        match t {
            Type::Map(e) => elements.push(e.as_ref().clone()),
            Type::Object(attrs) => elements.extend(attrs.values().cloned()),
            _ => return None,
        }
    }
    unify(&elements).map(Type::map)
}

fn unify_sequences(types: &[Type]) -> Option<Type> {
    let tuples: Vec<&Vec<Type>> = types
        .iter()
        .filter_map(|t| match t {
            Type::Tuple(elems) => Some(elems),
            _ => None,
        })
        .collect();

    if tuples.len() == types.len() && tuples.iter().all(|t| t.len() == tuples[0].len()) {
        let mut elems = Vec::with_capacity(tuples[0].len());
        for i in 0..tuples[0].len() {
            let candidates: Vec<Type> = tuples.iter().map(|t| t[i].clone()).collect();
            elems.push(unify(&candidates)?);
        }
        return Some(Type::Tuple(elems));
    }

    let mut elements = Vec::new();
    for t in types {
        match t {
            Type::List(e) => elements.push(e.as_ref().clone()),
            Type::Tuple(elems) => elements.extend(elems.iter().cloned()),
            _ => return None,
        }
    }
    unify(&elements).map(Type::list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_primitive() {
        assert_eq!(unify(&[Type::Number, Type::Number]), Some(Type::Number));
        assert_eq!(unify(&[Type::Number, Type::String]), Some(Type::String));
        assert_eq!(unify(&[]), Some(Type::Dynamic));
    }

    #[test]
    fn test_incompatible() {
        assert_eq!(unify(&[Type::String, Type::list(Type::String)]), None);
        assert_eq!(unify(&[Type::Bool, Type::object([("a", Type::Bool)])]), None);
    }

    #[test]
    fn test_objects() {
        let a = Type::object([("x", Type::Number)]);
        let b = Type::object([("x", Type::String)]);
        assert_eq!(unify(&[a.clone(), b]), Some(Type::object([("x", Type::String)])));

        let c = Type::object([("y", Type::Number)]);
        assert_eq!(unify(&[a, c]), Some(Type::map(Type::Number)));
    }

    #[test]
    fn test_tuples() {
        let a = Type::Tuple(vec![Type::Number]);
        let b = Type::Tuple(vec![Type::Number, Type::Number]);
        assert_eq!(unify(&[a, b]), Some(Type::list(Type::Number)));
    }
}
