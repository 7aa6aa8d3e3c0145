/// A lazily compiled, process-wide regex for a literal pattern.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`RouteTable`](crate::RouteTable) from `pattern => destination` pairs,
/// in declaration order.
///
/// ```
/// use resource_router::{Destination, routes};
///
/// let table = routes! {
///     pages: [(3, "/about")],
///     "blog/:url_title" => "blog/detail",
///     "feed" => ("site", "rss"),
///     "ping" => Destination::dynamic(|_, _| Ok(Some("pong".into()))),
/// }
/// .unwrap();
/// assert_eq!(table.len(), 3);
/// ```
#[macro_export]
macro_rules! routes {
    (
        $(pages: [ $(($page_id:expr, $page_uri:expr)),* $(,)? ],)?
        $(category: $category:expr,)?
        $($pattern:literal => $dest:expr),* $(,)?
    ) => {{
        (|| -> $crate::Result<$crate::RouteTable> {
            #[allow(unused_mut)]
            let mut pages = $crate::PageUris::new();
            $($( pages.insert($page_id, $page_uri); )*)?
            #[allow(unused_mut)]
            let mut table = $crate::RouteTable::with_pages(pages);
            $( table = table.with_category($category)?; )?
            $( table.add($pattern, $dest)?; )*
            Ok(table)
        })()
    }};
}
