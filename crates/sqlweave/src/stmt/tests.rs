use super::*;
use crate::dialect::DialectConfig;
use crate::{delete_from, from, insert_into, new_stmt, select, update};

/// Chunks sorted by position, per-chunk argument counts matching their
/// placeholders, and the flat argument list matching the chunk totals.
fn assert_chunk_invariants(q: &Stmt<'_>) {
    let chunks = &q.parts.chunks;
    assert!(
        chunks.windows(2).all(|w| w[0].pos <= w[1].pos),
        "chunks out of order: {chunks:?}"
    );
    for chunk in chunks {
        assert!(chunk.start <= chunk.end && chunk.end <= q.buf.len());
        assert_eq!(
            q.buf[chunk.range()].matches('?').count(),
            chunk.args,
            "chunk {:?} at {}",
            &q.buf[chunk.range()],
            chunk.pos
        );
    }
    assert_eq!(chunks.iter().map(|c| c.args).sum::<usize>(), q.args().len());
}

fn private_dialect(name: &str, placeholders: Placeholders) -> Dialect {
    Dialect::new(DialectConfig::new(name, placeholders))
}

// ==================== Ordering ====================

#[test]
fn renders_clauses_in_sql_order() {
    let q = from("t")
        .select("id")
        .where_("a = ?", [1])
        .group_by("g")
        .having("count(*) > ?", [2])
        .order_by("id")
        .limit(10)
        .offset(5);
    assert_eq!(
        q.sql(),
        "SELECT id FROM t WHERE a = ? GROUP BY g HAVING count(*) > ? ORDER BY id LIMIT ? OFFSET ?"
    );
    assert_chunk_invariants(&q);
}

#[test]
fn call_order_does_not_change_output() {
    let a = from("t")
        .select("id")
        .where_("a = ?", [1])
        .group_by("g")
        .having("count(*) > ?", [2])
        .order_by("id")
        .limit(10)
        .offset(5);
    let b = select("id")
        .offset(5)
        .limit(10)
        .order_by("id")
        .having("count(*) > ?", [2])
        .group_by("g")
        .where_("a = ?", [1])
        .from("t");

    assert_eq!(a.sql(), b.sql());
    assert_eq!(a.args(), b.args());
    assert_eq!(
        b.args(),
        &[Value::Int4(1), Value::Int4(2), Value::Int4(10), Value::Int4(5)]
    );
    assert_chunk_invariants(&b);
}

#[test]
fn args_follow_placeholders_when_where_comes_first() {
    let q = Dialect::postgres()
        .from("t")
        .where_("b = ?", ["b"])
        .select_expr("coalesce(x, ?) AS x", ["dflt"])
        .where_("c = ?", ["c"]);
    assert_eq!(
        q.sql(),
        "SELECT coalesce(x, $1) AS x FROM t WHERE b = $2 AND c = $3"
    );
    assert_eq!(
        q.args(),
        &[
            Value::Text("dflt".into()),
            Value::Text("b".into()),
            Value::Text("c".into())
        ]
    );
    assert_chunk_invariants(&q);
}

#[test]
fn repeated_columns_are_comma_separated() {
    let q = from("t").select("a").select("b").from("u").order_by("a").order_by("b DESC");
    assert_eq!(q.sql(), "SELECT a, b FROM t, u ORDER BY a, b DESC");
}

#[test]
fn limit_and_offset_are_replaced_not_duplicated() {
    let q = from("t").select("id").limit(10).offset(5).limit(20).offset(40);
    assert_eq!(q.sql(), "SELECT id FROM t LIMIT ? OFFSET ?");
    assert_eq!(q.args(), &[Value::Int4(20), Value::Int4(40)]);
    assert_chunk_invariants(&q);
}

#[test]
fn paginate_sets_limit_and_offset() {
    let q = from("t").select("id").paginate(3, 20);
    assert_eq!(q.sql(), "SELECT id FROM t LIMIT ? OFFSET ?");
    assert_eq!(q.args(), &[Value::Int8(20), Value::Int8(40)]);

    let first = from("t").select("id").paginate(0, 20);
    assert_eq!(first.sql(), "SELECT id FROM t LIMIT ?");
}

#[test]
fn clause_goes_after_the_last_chunk() {
    let q = from("t").select("id").where_("id = ?", [1]).clause("FOR UPDATE", ());
    assert_eq!(q.sql(), "SELECT id FROM t WHERE id = ? FOR UPDATE");

    let q = new_stmt("TRUNCATE TABLE t", ());
    assert_eq!(q.sql(), "TRUNCATE TABLE t");

    let q = new_stmt("SELECT", ())
        .expr("?", [1])
        .expr("?", [2])
        .clause("FROM dual", ());
    assert_eq!(q.sql(), "SELECT ?, ? FROM dual");
    assert_eq!(q.args().len(), 2);
    assert_chunk_invariants(&q);
}

#[test]
fn expr_extends_the_most_recent_clause() {
    let q = from("t").select("id").expr("name", ());
    assert_eq!(q.sql(), "SELECT id, name FROM t");

    let q = Dialect::postgres()
        .from("t")
        .select("id")
        .expr("coalesce(x, ?) AS x", [0])
        .where_("y = ?", [1])
        .group_by("id")
        .expr("x", ());
    assert_eq!(
        q.sql(),
        "SELECT id, coalesce(x, $1) AS x FROM t WHERE y = $2 GROUP BY id, x"
    );
    assert_eq!(q.args(), &[Value::Int4(0), Value::Int4(1)]);
    assert_chunk_invariants(&q);
}

#[test]
fn in_list_expands_placeholders() {
    let q = from("t")
        .select("id")
        .where_("status = ?", ["a"])
        .where_("id", ())
        .in_list([1, 2, 3]);
    assert_eq!(
        q.sql(),
        "SELECT id FROM t WHERE status = ? AND id IN (?, ?, ?)"
    );
    assert_eq!(q.args().len(), 4);
    assert_chunk_invariants(&q);

    let empty = from("t").select("id").where_("id", ()).in_list(Vec::<i64>::new());
    assert_eq!(empty.sql(), "SELECT id FROM t WHERE id IN (NULL)");
    assert!(empty.args().is_empty());
}

// ==================== Dialects ====================

#[test]
fn postgres_numbers_placeholders_across_clauses() {
    let q = Dialect::postgres()
        .select("id")
        .from("t")
        .where_("a=?", [1])
        .where_("b=?", [2]);
    assert_eq!(q.sql(), "SELECT id FROM t WHERE a=$1 AND b=$2");
    assert_eq!(q.args(), &[Value::Int4(1), Value::Int4(2)]);
}

#[test]
fn escaped_placeholder_is_literal() {
    let q = Dialect::postgres()
        .from("docs")
        .select("id")
        .where_(r"data \? 'tag'", ())
        .where_("owner = ?", [7]);
    assert_eq!(
        q.sql(),
        "SELECT id FROM docs WHERE data ? 'tag' AND owner = $1"
    );
    assert_eq!(q.args().len(), 1);
}

#[test]
fn no_dialect_and_sql_server_leave_placeholders() {
    let q = from("t").select("id").where_("a = ?", [1]);
    assert_eq!(q.sql(), "SELECT id FROM t WHERE a = ?");

    let q = Dialect::sql_server()
        .from("t")
        .select("id")
        .where_("a = @a", [Value::named("a", 1)]);
    assert_eq!(q.sql(), "SELECT id FROM t WHERE a = @a");
    assert_eq!(q.args().len(), 1);
}

#[test]
fn set_dialect_re_renders() {
    let q = from("t").select("id").where_("a = ?", [1]);
    assert_eq!(q.sql(), "SELECT id FROM t WHERE a = ?");
    let q = q.set_dialect(Dialect::postgres());
    assert_eq!(q.sql(), "SELECT id FROM t WHERE a = $1");
    assert_eq!(q.dialect().name(), "postgres");
}

// ==================== Joins ====================

#[test]
fn joins_render_after_the_from_list() {
    let q = from("users u")
        .join("orders o", "o.user_id = u.id")
        .left_join("addresses a", "a.user_id = u.id")
        .select("u.id")
        .where_("u.id = ?", [1]);
    assert_eq!(
        q.sql(),
        "SELECT u.id FROM users u JOIN orders o ON (o.user_id = u.id) \
         LEFT JOIN addresses a ON (a.user_id = u.id) WHERE u.id = ?"
    );

    let q = select("id")
        .full_join("b", "b.id = a.id")
        .right_join("c", "c.id = a.id")
        .from("a");
    assert_eq!(
        q.sql(),
        "SELECT id FROM a FULL JOIN b ON (b.id = a.id) RIGHT JOIN c ON (c.id = a.id)"
    );
}

// ==================== Composition ====================

#[test]
fn sub_query_in_select_list() {
    let pg = Dialect::postgres();
    let items = pg
        .from("items i")
        .select("count(*)")
        .where_("i.order_id = o.id AND i.kind = ?", ["x"]);
    let q = pg
        .from("orders o")
        .select("id")
        .sub_query("(", ") AS n", items)
        .where_("o.status = ?", ["open"]);
    assert_eq!(
        q.sql(),
        "SELECT id, (SELECT count(*) FROM items i WHERE i.order_id = o.id AND i.kind = $1) AS n \
         FROM orders o WHERE o.status = $2"
    );
    assert_eq!(
        q.args(),
        &[Value::Text("x".into()), Value::Text("open".into())]
    );
    assert_chunk_invariants(&q);
}

#[test]
fn sub_query_in_where_is_and_joined() {
    let inner = from("bans").select("user_id").where_("until > ?", [100]);
    let q = from("users")
        .select("id")
        .where_("active = ?", [true])
        .sub_query("id NOT IN (", ")", inner)
        .limit(5);
    assert_eq!(
        q.sql(),
        "SELECT id FROM users WHERE active = ? AND id NOT IN \
         (SELECT user_id FROM bans WHERE until > ?) LIMIT ?"
    );
    assert_eq!(
        q.args(),
        &[Value::Bool(true), Value::Int4(100), Value::Int4(5)]
    );
    assert_chunk_invariants(&q);
}

#[test]
fn postgres_sub_query_is_embedded_neutral() {
    let inner = Dialect::postgres()
        .from("bans")
        .select("user_id")
        .where_("until > ?", [100]);
    let q = from("users")
        .select("id")
        .where_("active = ?", [true])
        .sub_query("id NOT IN (", ")", inner);
    assert_eq!(
        q.sql(),
        "SELECT id FROM users WHERE active = ? AND id NOT IN \
         (SELECT user_id FROM bans WHERE until > ?)"
    );
    assert_eq!(q.args(), &[Value::Bool(true), Value::Int4(100)]);
}

#[test]
fn embedded_postgres_statement_is_neutralized() {
    let inner = Dialect::postgres().from("b").select("id").where_("y = ?", [2]);
    let q = from("a").select("id").where_("x = ?", [1]).union(false, inner);
    assert_eq!(
        q.sql(),
        "SELECT id FROM a WHERE x = ? UNION SELECT id FROM b WHERE y = ?"
    );
}

#[test]
fn union_args_and_ordering() {
    let pg = Dialect::postgres();
    let q = pg
        .from("a")
        .select("id")
        .where_("x = ?", [1])
        .order_by("id")
        .union(true, pg.from("b").select("id").where_("y = ?", [2]))
        .union(false, pg.from("c").select("id").where_("z = ?", [3]))
        .limit(10);
    assert_eq!(
        q.sql(),
        "SELECT id FROM a WHERE x = $1 UNION ALL SELECT id FROM b WHERE y = $2 \
         UNION SELECT id FROM c WHERE z = $3 ORDER BY id LIMIT $4"
    );
    assert_eq!(
        q.args(),
        &[Value::Int4(1), Value::Int4(2), Value::Int4(3), Value::Int4(10)]
    );
    assert_chunk_invariants(&q);
}

#[test]
fn with_builds_common_table_expressions() {
    let pg = Dialect::postgres();
    let q = pg
        .with(
            "recent",
            pg.from("orders").select("id, user_id").where_("created_at > ?", [10]),
        )
        .from("recent r")
        .select("r.id")
        .where_("r.user_id = ?", [3])
        .with("vip", pg.from("users").select("id").where_("tier = ?", ["gold"]));
    assert_eq!(
        q.sql(),
        "WITH recent AS (SELECT id, user_id FROM orders WHERE created_at > $1), \
         vip AS (SELECT id FROM users WHERE tier = $2) \
         SELECT r.id FROM recent r WHERE r.user_id = $3"
    );
    assert_eq!(
        q.args(),
        &[Value::Int4(10), Value::Text("gold".into()), Value::Int4(3)]
    );
    assert_chunk_invariants(&q);
}

// ==================== INSERT / UPDATE / DELETE ====================

#[test]
fn insert_with_set() {
    let q = insert_into("users")
        .set("name", "ann")
        .set_expr("created_at", "now()", ())
        .set("age", 30)
        .returning("id");
    assert_eq!(
        q.sql(),
        "INSERT INTO users ( name, created_at, age ) VALUES ( ?, now(), ? ) RETURNING id"
    );
    assert_eq!(q.args(), &[Value::Text("ann".into()), Value::Int4(30)]);
    assert_chunk_invariants(&q);
}

#[test]
fn bulk_insert_rows() {
    let mut q = Dialect::postgres().insert_into("t");
    for (a, b) in [(1, 2), (3, 4), (5, 6)] {
        q.new_row().set("a", a).set("b", b);
    }
    assert_eq!(
        q.sql(),
        "INSERT INTO t ( a, b ) VALUES ( $1, $2 ), ( $3, $4 ), ( $5, $6 )"
    );
    let expected: Vec<Value> = (1..=6).map(Value::Int4).collect();
    assert_eq!(q.args(), expected.as_slice());
    assert_chunk_invariants(&q);
}

#[test]
fn bulk_insert_after_plain_set() {
    let mut q = insert_into("t").set("a", 1);
    q.new_row().set_expr("a", "? + 1", [2]);
    assert_eq!(q.sql(), "INSERT INTO t ( a ) VALUES ( ? ), ( ? + 1 )");
    assert_eq!(q.args().len(), 2);
}

#[test]
fn update_with_set_and_where() {
    let q = update("users")
        .where_("id = ?", [7])
        .set("name", "bob")
        .set_expr("version", "version + ?", [1])
        .returning("version");
    assert_eq!(
        q.sql(),
        "UPDATE users SET name = ?, version = version + ? WHERE id = ? RETURNING version"
    );
    assert_eq!(
        q.args(),
        &[Value::Text("bob".into()), Value::Int4(1), Value::Int4(7)]
    );
    assert_chunk_invariants(&q);
}

#[test]
fn delete_with_where() {
    let q = Dialect::postgres()
        .delete_from("sessions")
        .where_("expires_at < ?", [5_i64]);
    assert_eq!(q.sql(), "DELETE FROM sessions WHERE expires_at < $1");
}

#[test]
#[should_panic(expected = "set requires an INSERT INTO or UPDATE statement")]
fn set_on_select_panics() {
    let _ = from("t").set("a", 1);
}

#[test]
#[should_panic(expected = "new_row requires an INSERT INTO statement")]
fn new_row_on_update_panics() {
    let mut q = update("t");
    let _ = q.new_row();
}

#[test]
fn clauses_fit_after_returning_until_the_last_slot() {
    let mut q = update("t").set("a", 1).returning("id");
    for i in 0..9 {
        q = q.clause(&format!("-- {i}"), ());
    }
    assert_eq!(q.last_pos(), Some(Position::RETURNING.after(90)));
}

#[test]
#[should_panic(expected = "clause position 1800 is out of range")]
fn clause_past_the_last_slot_panics() {
    let mut q = update("t").set("a", 1).returning("id");
    for i in 0..10 {
        q = q.clause(&format!("-- {i}"), ());
    }
}

#[test]
#[should_panic(expected = "expects 2 argument(s), got 1")]
fn refresh_with_wrong_arg_count_panics() {
    let mut q = from("t");
    q.add_chunk(Position::LIMIT, "LIMIT ?, ?", "", [1, 2], "");
    q.add_chunk(Position::LIMIT, "LIMIT ?, ?", "", [1], "");
}

// ==================== Cache, clone, pool ====================

#[test]
fn identical_shapes_hit_the_cache() {
    let d = private_dialect("cache-hits", Placeholders::Dollar);
    let build = |id: i64| d.from("t").select("id").where_("id = ?", [id]);

    let a = build(1);
    let b = build(2);
    assert_eq!(a.sql(), b.sql());

    let stats = d.cache_stats();
    assert_eq!(stats.entries, 1);
    assert_eq!((stats.hits, stats.misses), (1, 1));

    // Memoized: rendering again does not touch the cache.
    let _ = a.sql();
    assert_eq!(d.cache_stats().hits, 1);
}

#[test]
fn named_statements_share_one_entry() {
    let d = private_dialect("cache-names", Placeholders::Dollar);
    let a = d.from("t").select("id").where_("a = ?", [1]).set_name("by-a");
    let b = d.from("t").select("id").where_("a = ?", [2]).set_name("by-a");
    assert_eq!(a.name(), Some("by-a"));
    assert_eq!(a.sql(), "SELECT id FROM t WHERE a = $1");
    assert_eq!(b.sql(), a.sql());
    assert_eq!(d.cache_stats().entries, 1);
}

#[test]
fn clear_cache_forces_re_render() {
    let d = private_dialect("cache-clear", Placeholders::Question);
    let _ = d.from("t").select("id").sql().len();
    d.clear_cache();
    assert_eq!(d.cache_stats().entries, 0);
    assert_eq!(d.from("t").select("id").sql(), "SELECT id FROM t");
    assert_eq!(d.cache_stats().entries, 1);
}

#[test]
fn mutation_invalidates_the_memoized_render() {
    let q = from("t").select("id");
    assert_eq!(q.sql(), "SELECT id FROM t");
    let q = q.where_("a = ?", [1]);
    assert_eq!(q.sql(), "SELECT id FROM t WHERE a = ?");
}

#[test]
fn clone_forks_a_base_query() {
    let d = private_dialect("clone", Placeholders::Dollar);
    let base = d.from("users").where_("active = ?", [true]);
    let rows = base.clone().select("id, name").limit(20);
    let count = base.clone().select("count(*)");

    assert_eq!(rows.sql(), "SELECT id, name FROM users WHERE active = $1 LIMIT $2");
    assert_eq!(count.sql(), "SELECT count(*) FROM users WHERE active = $1");
    assert_eq!(base.sql(), "FROM users WHERE active = $1");
    assert_eq!(rows.args().len(), 2);
    assert_eq!(base.args().len(), 1);

    let before = d.cache_stats();
    let copy = base.clone();
    assert_eq!(copy.sql(), base.sql());
    assert_eq!(d.cache_stats(), before);
}

#[test]
fn clone_does_not_copy_destinations() {
    let mut id = 0_i64;
    let q = select("id").to(&mut id).from("t");
    assert_eq!(q.dest().len(), 1);
    assert!(q.clone().dest().is_empty());
}

#[test]
fn checked_out_statements_start_empty() {
    {
        let q = from("t").select("id").where_("a = ?", [1]);
        q.close();
    }
    let fresh = Stmt::checkout(Dialect::no_dialect());
    assert!(fresh.parts.chunks.is_empty());
    assert!(fresh.args().is_empty());
    assert!(fresh.dest().is_empty());
    assert!(fresh.buf.is_empty());
    assert_eq!(fresh.sql(), "");
    assert!(pool::statement_stats().reused + pool::statement_stats().allocated > 0);
}

#[test]
fn display_matches_sql() {
    let q = from("t").select("id");
    assert_eq!(q.to_string(), q.sql());
    assert_eq!(delete_from("t").to_string(), "DELETE FROM t");
}
