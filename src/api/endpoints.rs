//! Path templates of the Free Shops REST API, relative to the versioned base URL.

pub const DEFAULT_BASE_URL: &str = "https://mamun-reza-freeshops-backend.vercel.app/api/v1";

// Auth & dashboard
pub const LOGIN: &str = "/admin/login";
pub const PROFILE: &str = "/admin/getProfile";
pub const DASHBOARD: &str = "/admin/getDashboard";
pub const GRAPH_DATA: &str = "/admin/getGraphData";

// Articles
pub const ARTICLES: &str = "/admin/Article/getArticle";
pub const CREATE_ARTICLE: &str = "/admin/Article/createArticle";
pub const UPDATE_ARTICLE: &str = "/admin/Article/updateArticle";
pub const DELETE_ARTICLE: &str = "/admin/Article/deleteArticle";

// Users
pub const USERS: &str = "/admin/getAllUsers";
pub const USER_BY_ID: &str = "/admin/getUserById";
pub const BLOCK_USER: &str = "/admin/userActiveBlock";
pub const DELETE_USER: &str = "/admin/deleteUser";

// Auto dealership
pub const AUTO_DEALERSHIP: &str = "/admin/AutoDealerShip/allAutoDealerShip";
pub const CREATE_AUTO_DEALERSHIP: &str = "/admin/AutoDealerShip/addAutoDealerShip";
pub const UPDATE_AUTO_DEALERSHIP: &str = "/admin/AutoDealerShip/updateAutoDealerShip";
pub const DELETE_AUTO_DEALERSHIP: &str = "/admin/AutoDealerShip/deleteAutoDealerShip";
pub const ADD_DATA_IN_DATA: &str = "/admin/AutoDealerShip/addDataInData";
pub const ADD_DATA_IN_PROMOTED: &str = "/admin/AutoDealerShip/addDataInPromotedPlacement";
pub const ADD_DATA_IN_EVERYTHING: &str = "/admin/AutoDealerShip/addDataInEveryThing";

// Jobs
pub const JOBS: &str = "/admin/allJobsForAdmin";
pub const JOB_BY_ID: &str = "/admin/getJobs";
pub const UPDATE_JOB: &str = "/admin/updateJobs";
pub const DELETE_JOB: &str = "/admin/deleteJobs";

// Products
pub const PRODUCTS: &str = "/user/allProduct";
pub const PRODUCTS_ADMIN: &str = "/admin/allProductForAdmin";
pub const PRODUCT_BY_ID: &str = "/admin/getProduct";
pub const UPDATE_PRODUCT: &str = "/admin/updateProduct";
pub const DELETE_PRODUCT: &str = "/admin/deleteProduct";

// Orders & transactions
pub const ORDERS: &str = "/admin/getOrders";
pub const ORDER_BY_ID: &str = "/admin/getOrdersById";
pub const TRANSACTIONS: &str = "/admin/getTransactions";
pub const TRANSACTION_BY_ID: &str = "/admin/getTransactionsById";

// Settings & notifications
pub const SEND_NOTIFICATION: &str = "/admin/notification/sendNotification";
pub const ALL_NOTIFICATIONS: &str = "/admin/notification/allNotification";
pub const UPDATE_SETTINGS: &str = "/admin/updateSettings";

// Categories
pub const CATEGORIES: &str = "/admin/Category/allCategory";
pub const CREATE_CATEGORY: &str = "/admin/Category/addCategory";
pub const UPDATE_CATEGORY: &str = "/admin/Category/updateCategory";
pub const DELETE_CATEGORY: &str = "/admin/Category/deleteCategory";

// Sub-categories
pub const SUB_CATEGORIES: &str = "/SubCategory/all/Subcategory";
pub const SUB_CATEGORIES_ADMIN: &str = "/SubCategory/all/SubCategoryForAdmin";
pub const CREATE_SUB_CATEGORY: &str = "/SubCategory/addSubcategory";
pub const UPDATE_SUB_CATEGORY: &str = "/SubCategory/updateSubcategory";
pub const DELETE_SUB_CATEGORY: &str = "/SubCategory/deleteSubcategory";

// Conditions
pub const CONDITIONS: &str = "/admin/Condition/allCondition";
pub const CREATE_CONDITION: &str = "/admin/Condition/addCondition";
pub const UPDATE_CONDITION: &str = "/admin/Condition/updateCondition";
pub const DELETE_CONDITION: &str = "/admin/Condition/deleteCondition";

// Blog categories
pub const BLOG_CATEGORIES: &str = "/admin/BlogCategory/allBlogCategory";
pub const CREATE_BLOG_CATEGORY: &str = "/admin/BlogCategory/addBlogCategory";
pub const UPDATE_BLOG_CATEGORY: &str = "/admin/BlogCategory/updateBlogCategory";
pub const DELETE_BLOG_CATEGORY: &str = "/admin/BlogCategory/deleteBlogCategory";

// Blog pages
pub const BLOG_PAGES: &str = "/admin/allBlogPage";
pub const CREATE_BLOG_PAGE: &str = "/admin/createBlogPage";
pub const DELETE_BLOG_PAGE: &str = "/admin/deleteBlogPage";

// Blogs
pub const BLOGS: &str = "/admin/allBlog";
pub const BLOGS_ADMIN: &str = "/admin/allBlogForAdmin";
pub const GET_BLOG: &str = "/admin/getBlog";
pub const CREATE_BLOG: &str = "/admin/addBlog";
pub const UPDATE_BLOG: &str = "/admin/updateBlog";
pub const DELETE_BLOG: &str = "/admin/deleteBlog";
