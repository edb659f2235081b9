//! Static catalog of admin resources.
//!
//! Each entry maps the logical operations (list/get/create/update/delete) to
//! API paths and carries what the normalizer and cache need to know about the
//! resource: envelope field aliases and which cached resources a write makes
//! stale.

use super::endpoints as ep;

/// An API path, optionally with a second path tried once when the first fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
  pub primary: &'static str,
  pub fallback: Option<&'static str>,
}

impl Route {
  pub const fn new(primary: &'static str) -> Self {
    Self {
      primary,
      fallback: None,
    }
  }

  pub const fn with_fallback(primary: &'static str, fallback: &'static str) -> Self {
    Self {
      primary,
      fallback: Some(fallback),
    }
  }

  /// Path for an entity-scoped call (`<path>/<id>`).
  pub fn path_for(path: &str, id: &str) -> String {
    format!("{}/{}", path, id)
  }
}

/// Definition of one admin resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDef {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub list: Route,
  pub detail: Option<Route>,
  pub create: Option<Route>,
  pub update: Option<Route>,
  pub delete: Option<Route>,
  /// Field names the list envelope may nest the collection under.
  pub envelope_fields: &'static [&'static str],
  /// Fields a create payload must carry.
  pub required_fields: &'static [&'static str],
  /// Whether create/update send multipart form data.
  pub multipart: bool,
  /// Other cached resources a successful write makes stale.
  pub dependents: &'static [&'static str],
}

impl ResourceDef {
  /// Names of every cached resource a write to this one invalidates,
  /// starting with itself.
  pub fn invalidates(&self) -> Vec<&'static str> {
    std::iter::once(self.name)
      .chain(self.dependents.iter().copied())
      .collect()
  }
}

pub const DASHBOARD: &str = "dashboard";
pub const GRAPH: &str = "graph";
pub const PROFILE: &str = "profile";

pub const ARTICLES: ResourceDef = ResourceDef {
  name: "articles",
  aliases: &["a", "article"],
  description: "Editorial articles",
  list: Route::new(ep::ARTICLES),
  detail: None,
  create: Some(Route::new(ep::CREATE_ARTICLE)),
  update: Some(Route::new(ep::UPDATE_ARTICLE)),
  delete: Some(Route::new(ep::DELETE_ARTICLE)),
  envelope_fields: &["articles", "docs", "results"],
  required_fields: &["title", "description"],
  multipart: true,
  dependents: &[],
};

pub const PRODUCTS: ResourceDef = ResourceDef {
  name: "products",
  aliases: &["p", "product"],
  description: "Marketplace listings",
  list: Route::with_fallback(ep::PRODUCTS, ep::PRODUCTS_ADMIN),
  detail: Some(Route::new(ep::PRODUCT_BY_ID)),
  create: None,
  update: Some(Route::with_fallback(ep::UPDATE_PRODUCT, ep::UPDATE_PRODUCT)),
  delete: Some(Route::with_fallback(ep::DELETE_PRODUCT, ep::DELETE_PRODUCT)),
  envelope_fields: &["products", "docs", "results"],
  required_fields: &[],
  multipart: false,
  dependents: &[DASHBOARD],
};

pub const CATEGORIES: ResourceDef = ResourceDef {
  name: "categories",
  aliases: &["c", "category", "cat"],
  description: "Product categories",
  list: Route::new(ep::CATEGORIES),
  detail: None,
  create: Some(Route::new(ep::CREATE_CATEGORY)),
  update: Some(Route::new(ep::UPDATE_CATEGORY)),
  delete: Some(Route::new(ep::DELETE_CATEGORY)),
  envelope_fields: &["categories", "docs"],
  required_fields: &["name"],
  multipart: true,
  dependents: &["sub-categories"],
};

pub const SUB_CATEGORIES: ResourceDef = ResourceDef {
  name: "sub-categories",
  aliases: &["sc", "subcategories", "subcategory"],
  description: "Product sub-categories",
  list: Route::with_fallback(ep::SUB_CATEGORIES_ADMIN, ep::SUB_CATEGORIES),
  detail: None,
  create: Some(Route::new(ep::CREATE_SUB_CATEGORY)),
  update: Some(Route::new(ep::UPDATE_SUB_CATEGORY)),
  delete: Some(Route::new(ep::DELETE_SUB_CATEGORY)),
  envelope_fields: &["subCategories", "subcategories", "docs"],
  required_fields: &["name", "categoryId"],
  multipart: true,
  dependents: &[],
};

pub const CONDITIONS: ResourceDef = ResourceDef {
  name: "conditions",
  aliases: &["cond", "condition"],
  description: "Item conditions",
  list: Route::new(ep::CONDITIONS),
  detail: None,
  create: Some(Route::new(ep::CREATE_CONDITION)),
  update: Some(Route::new(ep::UPDATE_CONDITION)),
  delete: Some(Route::new(ep::DELETE_CONDITION)),
  envelope_fields: &["conditions", "docs"],
  required_fields: &["name"],
  multipart: false,
  dependents: &[],
};

pub const USERS: ResourceDef = ResourceDef {
  name: "users",
  aliases: &["u", "user"],
  description: "Registered users",
  list: Route::new(ep::USERS),
  detail: Some(Route::new(ep::USER_BY_ID)),
  create: None,
  update: None,
  delete: Some(Route::new(ep::DELETE_USER)),
  envelope_fields: &["docs", "users"],
  required_fields: &[],
  multipart: false,
  dependents: &[DASHBOARD],
};

pub const ORDERS: ResourceDef = ResourceDef {
  name: "orders",
  aliases: &["o", "order"],
  description: "Customer orders",
  list: Route::new(ep::ORDERS),
  detail: Some(Route::new(ep::ORDER_BY_ID)),
  create: None,
  update: None,
  delete: None,
  envelope_fields: &["orders", "docs"],
  required_fields: &[],
  multipart: false,
  dependents: &[],
};

pub const TRANSACTIONS: ResourceDef = ResourceDef {
  name: "transactions",
  aliases: &["t", "transaction", "tx"],
  description: "Payment transactions",
  list: Route::new(ep::TRANSACTIONS),
  detail: Some(Route::new(ep::TRANSACTION_BY_ID)),
  create: None,
  update: None,
  delete: None,
  envelope_fields: &["transactions", "docs"],
  required_fields: &[],
  multipart: false,
  dependents: &[],
};

pub const JOBS: ResourceDef = ResourceDef {
  name: "jobs",
  aliases: &["j", "job"],
  description: "Job postings",
  list: Route::new(ep::JOBS),
  detail: Some(Route::new(ep::JOB_BY_ID)),
  create: None,
  update: Some(Route::new(ep::UPDATE_JOB)),
  delete: Some(Route::new(ep::DELETE_JOB)),
  envelope_fields: &["jobs", "docs"],
  required_fields: &[],
  multipart: false,
  dependents: &[],
};

pub const AUTO_DEALERSHIPS: ResourceDef = ResourceDef {
  name: "auto-dealerships",
  aliases: &["ad", "dealerships", "dealership"],
  description: "Auto-dealership landing sections",
  list: Route::new(ep::AUTO_DEALERSHIP),
  detail: None,
  create: Some(Route::new(ep::CREATE_AUTO_DEALERSHIP)),
  update: Some(Route::new(ep::UPDATE_AUTO_DEALERSHIP)),
  delete: Some(Route::new(ep::DELETE_AUTO_DEALERSHIP)),
  envelope_fields: &["dealerships", "docs"],
  required_fields: &["title", "description"],
  multipart: false,
  dependents: &[],
};

pub const BLOG_CATEGORIES: ResourceDef = ResourceDef {
  name: "blog-categories",
  aliases: &["bc", "blogcategory"],
  description: "Blog categories",
  list: Route::new(ep::BLOG_CATEGORIES),
  detail: None,
  create: Some(Route::new(ep::CREATE_BLOG_CATEGORY)),
  update: Some(Route::new(ep::UPDATE_BLOG_CATEGORY)),
  delete: Some(Route::new(ep::DELETE_BLOG_CATEGORY)),
  envelope_fields: &["categories", "blogCategories", "docs"],
  required_fields: &["title", "description"],
  multipart: false,
  dependents: &["blogs"],
};

pub const BLOG_PAGES: ResourceDef = ResourceDef {
  name: "blog-pages",
  aliases: &["bp", "blogpage", "pages"],
  description: "Blog landing pages",
  list: Route::new(ep::BLOG_PAGES),
  detail: None,
  create: Some(Route::new(ep::CREATE_BLOG_PAGE)),
  update: None,
  delete: Some(Route::new(ep::DELETE_BLOG_PAGE)),
  envelope_fields: &["pages", "blogPages", "docs"],
  required_fields: &["title", "heading", "description"],
  multipart: true,
  dependents: &[],
};

pub const BLOGS: ResourceDef = ResourceDef {
  name: "blogs",
  aliases: &["b", "blog", "posts"],
  description: "Blog posts",
  list: Route::with_fallback(ep::BLOGS, ep::BLOGS_ADMIN),
  detail: Some(Route::new(ep::GET_BLOG)),
  create: Some(Route::new(ep::CREATE_BLOG)),
  update: Some(Route::new(ep::UPDATE_BLOG)),
  delete: Some(Route::new(ep::DELETE_BLOG)),
  envelope_fields: &["blogs", "docs"],
  required_fields: &["blogCategoryId", "title", "description"],
  multipart: true,
  dependents: &[],
};

pub const NOTIFICATIONS: ResourceDef = ResourceDef {
  name: "notifications",
  aliases: &["n", "notification"],
  description: "Push notifications sent to users",
  list: Route::new(ep::ALL_NOTIFICATIONS),
  detail: None,
  create: Some(Route::new(ep::SEND_NOTIFICATION)),
  update: None,
  delete: None,
  envelope_fields: &["notifications", "docs"],
  required_fields: &[],
  multipart: true,
  dependents: &[],
};

/// All catalogued resources.
pub const RESOURCES: &[ResourceDef] = &[
  ARTICLES,
  PRODUCTS,
  CATEGORIES,
  SUB_CATEGORIES,
  CONDITIONS,
  USERS,
  ORDERS,
  TRANSACTIONS,
  JOBS,
  AUTO_DEALERSHIPS,
  BLOG_CATEGORIES,
  BLOG_PAGES,
  BLOGS,
  NOTIFICATIONS,
];

/// Resources matching `input`, best match first.
///
/// Ranking: exact name, exact alias, name prefix, alias prefix, name
/// substring, alias substring.
pub fn suggestions(input: &str) -> Vec<&'static ResourceDef> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return RESOURCES.iter().collect();
  }

  let mut matches: Vec<(&ResourceDef, u32)> = Vec::new();

  for res in RESOURCES {
    let rank = if res.name == input_lower {
      0
    } else if res.aliases.contains(&input_lower.as_str()) {
      1
    } else if res.name.starts_with(&input_lower) {
      2
    } else if res.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if res.name.contains(&input_lower) {
      4
    } else if res.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((res, rank));
  }

  // stable sort keeps catalog order within a rank
  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(res, _)| res).collect()
}

/// Resolve user input to a single resource (the best suggestion).
pub fn resolve(input: &str) -> Option<&'static ResourceDef> {
  if input.trim().is_empty() {
    return None;
  }
  suggestions(input).into_iter().next()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(suggestions("").len(), RESOURCES.len());
    assert!(resolve("").is_none());
  }

  #[test]
  fn test_exact_match() {
    assert_eq!(resolve("products").map(|r| r.name), Some("products"));
    assert_eq!(resolve("Blogs").map(|r| r.name), Some("blogs"));
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(resolve("p").map(|r| r.name), Some("products"));
    assert_eq!(resolve("sc").map(|r| r.name), Some("sub-categories"));
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(resolve("prod").map(|r| r.name), Some("products"));
    assert_eq!(resolve("blog-c").map(|r| r.name), Some("blog-categories"));
  }

  #[test]
  fn test_substring_match() {
    assert_eq!(resolve("dealer").map(|r| r.name), Some("auto-dealerships"));
  }

  #[test]
  fn test_unknown_input() {
    assert!(resolve("zzz").is_none());
  }

  #[test]
  fn test_names_are_unique() {
    for res in RESOURCES {
      assert_eq!(resolve(res.name), Some(res));
    }
  }

  #[test]
  fn test_invalidates_includes_self_then_dependents() {
    assert_eq!(PRODUCTS.invalidates(), vec!["products", DASHBOARD]);
    assert_eq!(CONDITIONS.invalidates(), vec!["conditions"]);
  }

  #[test]
  fn test_fallback_routes() {
    assert_eq!(PRODUCTS.list.fallback, Some(ep::PRODUCTS_ADMIN));
    assert_eq!(SUB_CATEGORIES.list.fallback, Some(ep::SUB_CATEGORIES));
    assert_eq!(BLOGS.list.fallback, Some(ep::BLOGS_ADMIN));
    assert_eq!(USERS.list.fallback, None);
  }
}
