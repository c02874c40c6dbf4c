use linkshelf_core::{
    DbError, Group, Link, LinkFilter, LinkOrder, LinkStore, RepoError, SearchError, StoreConfig,
    Tag,
};

fn store() -> LinkStore {
    LinkStore::open_in_memory().unwrap()
}

fn titled(url: &str, title: &str) -> Link {
    let mut link = Link::new(url);
    link.og_title = Some(title.to_string());
    link
}

#[test]
fn inserted_link_reads_back_with_group_and_tags() {
    let store = store();
    let group = Group::new("Reading", "book", "#FFAA00");
    let news = Tag::new("news", "#FF0000");
    let rust = Tag::new("Rust", "#00FF00");
    store.insert_group(&group).unwrap();
    store.insert_tag(&news).unwrap();
    store.insert_tag(&rust).unwrap();

    let mut link = titled("https://blog.rust-lang.org", "Rust Blog");
    link.og_description = Some("Empowering everyone".to_string());
    link.note = Some("weekly".to_string());
    link.starred = true;
    link.group = Some(group);
    link.tags = vec![news, rust];
    store.insert_link(&link).unwrap();

    assert_eq!(store.fetch_link(link.id).unwrap(), Some(link.clone()));
    assert_eq!(store.fetch_link(Link::new("x").id).unwrap(), None);
}

#[test]
fn tags_attached_out_of_name_order_round_trip() {
    let store = store();
    let zeta = Tag::new("zeta", "#000001");
    let alpha = Tag::new("alpha", "#000002");
    let mid = Tag::new("Mid", "#000003");
    for tag in [&zeta, &alpha, &mid] {
        store.insert_tag(tag).unwrap();
    }

    let mut link = Link::new("https://example.com/unordered");
    link.tags = vec![zeta.clone(), alpha.clone(), mid.clone()];
    store.insert_link(&link).unwrap();

    let loaded = store.fetch_link(link.id).unwrap().unwrap();
    assert_eq!(loaded, link);
    let names = loaded
        .tags
        .iter()
        .map(|tag| tag.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["alpha", "Mid", "zeta"]);

    link.tags = vec![zeta, alpha];
    store.update_link(&mut link).unwrap();
    assert_eq!(store.fetch_link(link.id).unwrap(), Some(link));
}

#[test]
fn update_replaces_tag_membership_and_bumps_timestamp() {
    let store = store();
    let first = Tag::new("first", "#111111");
    let second = Tag::new("second", "#222222");
    store.insert_tag(&first).unwrap();
    store.insert_tag(&second).unwrap();

    let mut link = Link::new("https://example.com");
    link.created_at -= 60;
    link.updated_at = link.created_at;
    link.tags = vec![first.clone()];
    store.insert_link(&link).unwrap();

    link.remove_tag(&first);
    link.add_tag(second.clone());
    link.unread = false;
    store.update_link(&mut link).unwrap();
    assert!(link.updated_at > link.created_at);

    let loaded = store.fetch_link(link.id).unwrap().unwrap();
    assert_eq!(loaded.tags, vec![second]);
    assert!(!loaded.unread);
    assert_eq!(loaded.updated_at, link.updated_at);
    assert_eq!(store.tag_links_count(first.id).unwrap(), 0);
}

#[test]
fn updating_missing_link_is_not_found() {
    let store = store();
    let mut link = Link::new("https://missing.example");
    let err = store.update_link(&mut link).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { table: "link", id } if id == link.id));
}

#[test]
fn deleting_tag_detaches_it_from_every_link() {
    let store = store();
    let shared = Tag::new("shared", "#333333");
    store.insert_tag(&shared).unwrap();

    let mut ids = Vec::new();
    for index in 0..5 {
        let mut link = Link::new(format!("https://example.com/{index}"));
        link.tags = vec![shared.clone()];
        store.insert_link(&link).unwrap();
        ids.push(link.id);
    }
    assert_eq!(store.tag_links_count(shared.id).unwrap(), 5);

    assert!(store.delete_tag(shared.id).unwrap());
    assert!(!store.delete_tag(shared.id).unwrap());
    assert_eq!(store.tag_links_count(shared.id).unwrap(), 0);
    for id in ids {
        let link = store.fetch_link(id).unwrap().unwrap();
        assert!(link.tags.is_empty());
    }
}

#[test]
fn deleting_group_keeps_links_without_group() {
    let store = store();
    let group = Group::new("Work", "briefcase", "#0000FF");
    store.insert_group(&group).unwrap();
    let mut link = Link::new("https://example.com/work");
    link.group = Some(group.clone());
    store.insert_link(&link).unwrap();
    assert_eq!(store.group_links_count(group.id).unwrap(), 1);

    assert!(store.delete_group(group.id).unwrap());
    let loaded = store.fetch_link(link.id).unwrap().unwrap();
    assert_eq!(loaded.group, None);
    assert_eq!(store.group_links_count(group.id).unwrap(), 0);
}

#[test]
fn deleting_link_removes_its_junction_rows() {
    let store = store();
    let tag = Tag::new("t", "#444444");
    store.insert_tag(&tag).unwrap();
    let mut link = Link::new("https://example.com/gone");
    link.tags = vec![tag.clone()];
    store.insert_link(&link).unwrap();

    assert!(store.delete_link(link.id).unwrap());
    assert!(!store.delete_link(link.id).unwrap());
    assert_eq!(store.fetch_link(link.id).unwrap(), None);
    assert_eq!(store.tag_links_count(tag.id).unwrap(), 0);
    assert!(store.fetch_tag(tag.id).unwrap().is_some());
}

#[test]
fn link_exists_matches_exact_url() {
    let store = store();
    store.insert_link(&Link::new("https://example.com/a")).unwrap();
    assert!(store.link_exists("https://example.com/a").unwrap());
    assert!(!store.link_exists("https://example.com/A").unwrap());
    assert!(!store.link_exists("https://example.com").unwrap());
}

#[test]
fn duplicate_group_name_is_a_unique_violation() {
    let store = store();
    store
        .insert_group(&Group::new("Inbox", "tray", "#000000"))
        .unwrap();
    let err = store
        .insert_group(&Group::new("Inbox", "tray", "#FFFFFF"))
        .unwrap_err();
    assert!(err.as_db().is_some_and(DbError::is_unique_violation));
    assert!(store.group_exists("Inbox").unwrap());
    assert_eq!(store.fetch_groups().unwrap().len(), 1);
}

#[test]
fn duplicate_tag_names_are_allowed() {
    let store = store();
    store.insert_tag(&Tag::new("dup", "#000000")).unwrap();
    store.insert_tag(&Tag::new("dup", "#FFFFFF")).unwrap();
    assert!(store.tag_exists("dup").unwrap());
    assert!(!store.tag_exists("other").unwrap());
    assert_eq!(store.fetch_tags().unwrap().len(), 2);
}

#[test]
fn failed_link_insert_leaves_no_junction_rows() {
    let store = store();
    let tag = Tag::new("t", "#555555");
    store.insert_tag(&tag).unwrap();
    let mut link = Link::new("https://example.com/once");
    store.insert_link(&link).unwrap();

    link.tags = vec![tag.clone()];
    let err = store.insert_link(&link).unwrap_err();
    assert!(err.as_db().is_some_and(DbError::is_unique_violation));
    assert_eq!(store.tag_links_count(tag.id).unwrap(), 0);
}

#[test]
fn tags_and_groups_update_in_place() {
    let store = store();
    let mut tag = Tag::new("draft", "#666666");
    store.insert_tag(&tag).unwrap();
    tag.name = "final".to_string();
    tag.description = Some("done".to_string());
    store.update_tag(&tag).unwrap();
    assert_eq!(store.fetch_tag(tag.id).unwrap(), Some(tag));

    let mut group = Group::new("Old", "folder", "#777777");
    store.insert_group(&group).unwrap();
    group.name = "New".to_string();
    store.update_group(&group).unwrap();
    assert_eq!(store.fetch_group(group.id).unwrap(), Some(group));
}

#[test]
fn listings_honor_order_and_filter() {
    let store = store();
    let tag = Tag::new("pick", "#888888");
    store.insert_tag(&tag).unwrap();

    let mut oldest = titled("https://c.example", "charlie");
    oldest.created_at = 1_000;
    oldest.updated_at = 5_000;
    let mut middle = titled("https://a.example", "Alpha");
    middle.created_at = 2_000;
    middle.updated_at = 2_000;
    middle.starred = true;
    middle.tags = vec![tag.clone()];
    let mut newest = titled("https://b.example", "bravo");
    newest.created_at = 3_000;
    newest.updated_at = 3_000;
    newest.archived = true;
    for link in [&oldest, &middle, &newest] {
        store.insert_link(link).unwrap();
    }

    let ids = |order, filter| store.fetch_link_ids(order, filter).unwrap();
    assert_eq!(
        ids(LinkOrder::Newest, LinkFilter::All),
        vec![newest.id, middle.id, oldest.id]
    );
    assert_eq!(
        ids(LinkOrder::Oldest, LinkFilter::All),
        vec![oldest.id, middle.id, newest.id]
    );
    assert_eq!(
        ids(LinkOrder::Name, LinkFilter::All),
        vec![middle.id, newest.id, oldest.id]
    );
    assert_eq!(
        ids(LinkOrder::LastUpdated, LinkFilter::All),
        vec![oldest.id, newest.id, middle.id]
    );
    assert_eq!(ids(LinkOrder::Newest, LinkFilter::Starred), vec![middle.id]);
    assert_eq!(ids(LinkOrder::Newest, LinkFilter::Archived), vec![newest.id]);
    assert_eq!(
        ids(LinkOrder::Newest, LinkFilter::WithTag(tag.id)),
        vec![middle.id]
    );

    let links = store.fetch_links(LinkOrder::Oldest, LinkFilter::All).unwrap();
    assert_eq!(links[1], middle);
}

#[test]
fn search_matches_url_title_and_description_prefixes() {
    let store = store();
    let mut rust = titled("https://doc.rust-lang.org/book", "The Rust Programming Language");
    rust.og_description = Some("Ownership and borrowing explained".to_string());
    let python = titled("https://docs.python.org", "Python documentation");
    store.insert_link(&rust).unwrap();
    store.insert_link(&python).unwrap();

    assert_eq!(store.search("owner").unwrap(), vec![rust.id]);
    assert_eq!(store.search("progr lang").unwrap(), vec![rust.id]);
    assert_eq!(store.search("python").unwrap(), vec![python.id]);
    assert!(store.search("haskell").unwrap().is_empty());
    assert!(store.search("   ").unwrap().is_empty());
    assert_eq!(store.search("rust AND OR ownership").unwrap(), vec![rust.id]);

    let mut both = store.search("rust OR python").unwrap();
    both.sort();
    let mut expected = vec![rust.id, python.id];
    expected.sort();
    assert_eq!(both, expected);
}

#[test]
fn search_index_follows_updates_and_deletes() {
    let store = store();
    let mut link = titled("https://example.com", "Gardening tips");
    store.insert_link(&link).unwrap();
    assert_eq!(store.search("garden").unwrap(), vec![link.id]);

    link.og_title = Some("Cooking tips".to_string());
    store.update_link(&mut link).unwrap();
    assert!(store.search("garden").unwrap().is_empty());
    assert_eq!(store.search("cook").unwrap(), vec![link.id]);

    store.delete_link(link.id).unwrap();
    assert!(store.search("cook").unwrap().is_empty());
}

#[test]
fn control_characters_in_search_are_ignored() {
    let store = store();
    let link = titled("https://example.com", "Query syntax");
    store.insert_link(&link).unwrap();
    let hits = store.search("\"query\" (syntax*").unwrap();
    assert_eq!(hits, vec![link.id]);
}

#[test]
fn stats_count_flags_across_collection() {
    let store = store();
    assert_eq!(store.stats().unwrap().total, 0);

    let mut read_starred = Link::new("https://one.example");
    read_starred.unread = false;
    read_starred.starred = true;
    let mut archived = Link::new("https://two.example");
    archived.archived = true;
    let plain = Link::new("https://three.example");
    for link in [&read_starred, &archived, &plain] {
        store.insert_link(link).unwrap();
    }

    let stats = store.stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.unread, 2);
    assert_eq!(stats.starred, 1);
    assert_eq!(stats.archived, 1);
}

#[test]
fn links_are_counted_per_day_within_last_week() {
    let store = store();
    // 2024-03-10T12:00:00Z
    let now = 1_710_072_000_i64;
    let day = 86_400;
    let created = [now - 60, now - 120, now - day, now - 3 * day, now - 8 * day];
    for (index, created_at) in created.into_iter().enumerate() {
        let mut link = Link::new(format!("https://example.com/{index}"));
        link.created_at = created_at;
        link.updated_at = created_at;
        store.insert_link(&link).unwrap();
    }

    let counts = store.links_added_in_week_before(now).unwrap();
    let flattened = counts
        .iter()
        .map(|entry| (entry.day.as_str(), entry.count))
        .collect::<Vec<_>>();
    assert_eq!(
        flattened,
        vec![("2024-03-10", 2), ("2024-03-09", 1), ("2024-03-07", 1)]
    );
    assert!(store.links_added_in_last_seven_days().unwrap().is_empty());
}

#[test]
fn extreme_reference_times_do_not_overflow_window() {
    let store = store();
    store.insert_link(&Link::new("https://example.com")).unwrap();
    assert_eq!(store.links_added_in_week_before(i64::MIN).unwrap().len(), 1);
    assert!(store.links_added_in_week_before(i64::MAX).unwrap().is_empty());
}

#[test]
fn async_operations_resolve_through_pending_handles() {
    let store = store();
    let mut link = titled("https://async.example", "Asynchronous");
    store.insert_link_async(link.clone()).wait().unwrap();

    link.starred = true;
    store.update_link_async(&mut link).wait().unwrap();

    let links = store
        .fetch_links_async(LinkOrder::Newest, LinkFilter::Starred)
        .wait()
        .unwrap();
    assert_eq!(links, vec![link.clone()]);
    assert_eq!(store.search_async("asynch").wait().unwrap(), vec![link.id]);

    assert!(store.delete_link_async(link.id).wait().unwrap());
    assert!(store
        .fetch_links_async(LinkOrder::Newest, LinkFilter::All)
        .wait()
        .unwrap()
        .is_empty());
}

#[test]
fn suspended_store_rejects_operations() {
    let store = store();
    store.suspend();
    assert!(store.is_suspended());
    assert!(matches!(
        store.fetch_tags(),
        Err(RepoError::Db(DbError::Suspended))
    ));
    assert!(matches!(
        store.search("anything"),
        Err(SearchError::Db(DbError::Suspended))
    ));

    store.resume();
    assert!(store.fetch_tags().unwrap().is_empty());
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("links.sqlite"));
    let link = titled("https://persist.example", "Persisted");
    {
        let store = LinkStore::open(&config).unwrap();
        store.insert_link(&link).unwrap();
    }

    let store = LinkStore::open(&config).unwrap();
    assert_eq!(store.fetch_link(link.id).unwrap(), Some(link));
    assert_eq!(store.search("persist").unwrap().len(), 1);
}
