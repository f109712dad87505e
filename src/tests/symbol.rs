use super::*;

#[test]
fn named_constants_get_distinct_ids() {
    let symbols = SymbolAllocator::new();
    let alpha = symbols.named("alpha", BaseType::Symbol).unwrap();
    let beta = symbols.named("beta", BaseType::Number).unwrap();

    assert_ne!(alpha.id(), beta.id());
    assert_ne!(alpha, beta);
    assert_eq!(symbols.resolve(alpha.id()), Some("alpha"));
    assert_eq!(symbols.len(), 2);
}

#[test]
fn duplicate_name_is_rejected() {
    let symbols = SymbolAllocator::new();
    symbols.named("alpha", BaseType::Symbol).unwrap();
    let err = symbols.named("alpha", BaseType::Number).unwrap_err();
    assert!(matches!(err, SymlogError::DuplicateSymbol { .. }));
}

#[test]
fn fresh_names_avoid_user_names() {
    let symbols = SymbolAllocator::new();
    symbols.named("sym1", BaseType::Symbol).unwrap();
    let fresh = symbols.fresh(BaseType::Symbol).unwrap();
    assert_ne!(fresh.name(), "sym1");
    let again = symbols.fresh(BaseType::Symbol).unwrap();
    assert_ne!(fresh.name(), again.name());
}

#[test]
fn encodings_use_reserved_namespace() {
    let symbols = SymbolAllocator::new();
    let s = symbols.named("s", BaseType::Symbol).unwrap();
    let n = symbols.named("n", BaseType::Number).unwrap();

    assert!(s.encoded_string().starts_with(SYMBOLIC_PREFIX));
    assert!(s.binding_variable().starts_with(BINDING_PREFIX));
    assert!(s.domain_relation().starts_with(DOMAIN_PREFIX));
    assert_eq!(n.encoded_number(), NUMBER_POOL_BASE);
    assert!(in_number_pool(n.encoded_number()));
    assert!(!in_number_pool(0));
}

#[test]
fn number_pool_is_finite() {
    let symbols = SymbolAllocator::new();
    for _ in 0..NUMBER_POOL_SIZE {
        symbols.fresh(BaseType::Number).unwrap();
    }
    let err = symbols.fresh(BaseType::Number).unwrap_err();
    assert!(matches!(err, SymlogError::PoolExhausted { .. }));
    // Strings are not drawn from the pool.
    symbols.fresh(BaseType::Symbol).unwrap();
}

#[test]
fn allocation_is_thread_safe() {
    let symbols = SymbolAllocator::new();
    let ids: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| symbols.fresh(BaseType::Number).unwrap().id()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), 4);
}
