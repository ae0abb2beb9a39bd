//! Declarative table of remote operations
//!
//! Each entry maps one tool onto one OCI REST call. The executor in
//! [`super::remote`] handles validation, encoding and pagination for all of
//! them.

use serde_json::{json, Map, Value};

use crate::oci::Service;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_method(&self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
    StringList,
    Object,
}

impl ParamKind {
    fn schema(&self) -> Value {
        match self {
            ParamKind::String => json!({"type": "string"}),
            ParamKind::Integer => json!({"type": "integer"}),
            ParamKind::Boolean => json!({"type": "boolean"}),
            ParamKind::StringList => json!({"type": "array", "items": {"type": "string"}}),
            ParamKind::Object => json!({"type": "object"}),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Param {
    /// Tool argument name
    pub name: &'static str,
    /// Name on the wire (path placeholder or query key)
    pub wire: &'static str,
    pub location: ParamLocation,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl Param {
    /// Filled from the profile's tenancy when omitted
    pub fn defaults_to_tenancy(&self) -> bool {
        matches!(self.name, "compartment_id" | "tenancy_id")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ApiOperation {
    pub name: &'static str,
    pub description: &'static str,
    pub service: Service,
    pub method: HttpMethod,
    pub path: &'static str,
    pub params: &'static [Param],
    pub paginated: bool,
}

impl ApiOperation {
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in self.params {
            let mut schema = param.kind.schema();
            let description = if param.defaults_to_tenancy() {
                format!("{} (defaults to the tenancy)", param.description)
            } else {
                param.description.to_string()
            };
            schema["description"] = Value::String(description);
            properties.insert(param.name.to_string(), schema);
            if param.required && !param.defaults_to_tenancy() {
                required.push(Value::String(param.name.to_string()));
            }
        }

        properties.insert(
            "profile".to_string(),
            json!({"type": "string", "description": "OCI config profile (defaults to the active profile)"}),
        );
        properties.insert(
            "region".to_string(),
            json!({"type": "string", "description": "Region name or key (defaults to the OCID's region, then the profile region)"}),
        );
        if self.paginated {
            properties.insert(
                "max_items".to_string(),
                json!({"type": "integer", "description": "Upper bound on items collected across pages"}),
            );
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

const fn path(name: &'static str, wire: &'static str, description: &'static str) -> Param {
    Param {
        name,
        wire,
        location: ParamLocation::Path,
        kind: ParamKind::String,
        required: true,
        description,
    }
}

const fn query(name: &'static str, wire: &'static str, kind: ParamKind, required: bool, description: &'static str) -> Param {
    Param {
        name,
        wire,
        location: ParamLocation::Query,
        kind,
        required,
        description,
    }
}

const fn opt(name: &'static str, wire: &'static str, kind: ParamKind, description: &'static str) -> Param {
    query(name, wire, kind, false, description)
}

use ParamKind::{Boolean, Integer, String as Str, StringList};

const COMPARTMENT: Param = query("compartment_id", "compartmentId", Str, true, "Compartment OCID");
const COMPARTMENT_OPT: Param = opt("compartment_id", "compartmentId", Str, "Compartment OCID");
const SUBTREE: Param = opt("compartment_id_in_subtree", "compartmentIdInSubtree", Boolean, "Include sub-compartments");
const LIFECYCLE: Param = opt("lifecycle_state", "lifecycleState", StringList, "Lifecycle states to include");
const LIFECYCLE_ONE: Param = opt("lifecycle_state", "lifecycleState", Str, "Lifecycle state filter");
const STATUS: Param = opt("status", "status", StringList, "Resource status filter (ENABLED, DISABLED, TERMINATED)");
const INTERVAL: Param = opt("analysis_time_interval", "analysisTimeInterval", Str, "ISO-8601 duration such as P30D");
const TIME_START: Param = opt("time_interval_start", "timeIntervalStart", Str, "RFC 3339 start time");
const TIME_END: Param = opt("time_interval_end", "timeIntervalEnd", Str, "RFC 3339 end time");
const DB_TYPE: Param = opt("database_type", "databaseType", StringList, "Database types, e.g. ADW-S, ATP-D, EXTERNAL-NONCDB");
const DB_ID: Param = opt("database_id", "databaseId", StringList, "Underlying database OCIDs");
const INSIGHT_ID: Param = opt("id", "id", StringList, "Insight OCIDs");
const RESOURCE_METRIC: Param = query("resource_metric", "resourceMetric", Str, true, "CPU, STORAGE, MEMORY, IO");
const HOST_RESOURCE_METRIC: Param = query("resource_metric", "resourceMetric", Str, true, "CPU, MEMORY, LOGICAL_MEMORY, STORAGE, NETWORK");
const PERCENTILE: Param = opt("percentile", "percentile", Integer, "Percentile (50-99)");
const FORECAST_DAYS: Param = opt("forecast_days", "forecastDays", Integer, "Days to forecast");
const FORECAST_MODEL: Param = opt("forecast_model", "forecastModel", Str, "LINEAR, ML_AUTO, ML_NO_AUTO");
const STATISTIC: Param = opt("statistic", "statistic", Str, "AVG or MAX");
const SQL_ID: Param = query("sql_identifier", "sqlIdentifier", Str, true, "SQL_ID");
const SQL_IDS: Param = opt("sql_identifier", "sqlIdentifier", StringList, "SQL_ID filter");
const DB_TIME_PCT: Param = opt("database_time_pct_greater_than", "databaseTimePctGreaterThan", Integer, "Minimum share of DB time in percent");
const HOST_TYPE: Param = opt("host_type", "hostType", StringList, "Host types, e.g. EXTERNAL-HOST, EXACC-HOST");
const PLATFORM_TYPE: Param = opt("platform_type", "platformType", StringList, "LINUX, SOLARIS, SUNOS, ZLINUX, WINDOWS, AIX");
const HOST_INSIGHT_ID: Param = opt("id", "id", StringList, "Host insight OCIDs");
const VCN: Param = opt("vcn_id", "vcnId", Str, "VCN OCID");
const NAME: Param = opt("name", "name", Str, "Exact name filter");
const DISPLAY_NAME: Param = opt("display_name", "displayName", Str, "Display name filter");
const TIME_GTE: Param = opt("time_greater_than_or_equal_to", "timeGreaterThanOrEqualTo", Str, "RFC 3339 lower bound");
const TIME_LTE: Param = opt("time_less_than_or_equal_to", "timeLessThanOrEqualTo", Str, "RFC 3339 upper bound");
const MANAGED_DB: Param = path("managed_database_id", "managedDatabaseId", "Managed database OCID");
const USER_NAME: Param = path("user_name", "userName", "Database user name");
const AWR_DB: Param = path("awr_db_id", "awrDbId", "AWR database identifier");
const INST_NUM: Param = opt("inst_num", "instNum", Str, "Instance number");
const BEGIN_SN: Param = opt("begin_sn_id_greater_than_or_equal_to", "beginSnIdGreaterThanOrEqualTo", Integer, "Lowest snapshot id");
const END_SN: Param = opt("end_sn_id_less_than_or_equal_to", "endSnIdLessThanOrEqualTo", Integer, "Highest snapshot id");

const DB_FILTERS: [Param; 4] = [COMPARTMENT, DB_TYPE, DB_ID, INSIGHT_ID];

macro_rules! op {
    ($name:expr, $service:expr, $method:expr, $path:expr, $paginated:expr, $desc:expr, [$($param:expr),* $(,)?]) => {
        ApiOperation {
            name: $name,
            description: $desc,
            service: $service,
            method: $method,
            path: $path,
            params: &[$($param),*],
            paginated: $paginated,
        }
    };
}

use HttpMethod::{Get, Post};
use Service::{Database, DatabaseManagement as Dbm, Identity, OperationsInsights as Opsi};

/// Every remote operation exposed as a tool
pub static OPERATIONS: &[ApiOperation] = &[
    // Database insights
    op!("list_database_insights", Opsi, Get, "/databaseInsights", true,
        "List database insights registered with Operations Insights",
        [COMPARTMENT, SUBTREE, DB_TYPE, DB_ID, INSIGHT_ID, LIFECYCLE, STATUS,
         opt("fields", "fields", StringList, "Fields to return")]),
    op!("get_database_insight", Opsi, Get, "/databaseInsights/{databaseInsightId}", false,
        "Get one database insight",
        [path("database_insight_id", "databaseInsightId", "Database insight OCID")]),
    op!("summarize_database_insight_resource_statistics", Opsi, Get, "/databaseInsights/resourceStatistics", false,
        "Resource statistics (usage, capacity, growth) per database",
        [DB_FILTERS[0], DB_FILTERS[1], DB_FILTERS[2], DB_FILTERS[3], RESOURCE_METRIC, INTERVAL, TIME_START, TIME_END,
         SUBTREE, PERCENTILE, FORECAST_DAYS,
         opt("insight_by", "insightBy", Str, "Sort insights by this field")]),
    op!("summarize_database_insight_resource_usage", Opsi, Get, "/databaseInsights/resourceUsageSummary", false,
        "Aggregated resource usage across databases",
        [COMPARTMENT, DB_TYPE, DB_ID, INSIGHT_ID, RESOURCE_METRIC, INTERVAL, TIME_START, TIME_END, SUBTREE, PERCENTILE]),
    op!("summarize_database_insight_resource_usage_trend", Opsi, Get, "/databaseInsights/resourceUsageTrend", false,
        "Resource usage over time",
        [COMPARTMENT, DB_TYPE, DB_ID, INSIGHT_ID, RESOURCE_METRIC, INTERVAL, TIME_START, TIME_END, SUBTREE]),
    op!("summarize_database_insight_resource_capacity_trend", Opsi, Get, "/databaseInsights/resourceCapacityTrend", false,
        "Allocated capacity over time",
        [COMPARTMENT, DB_TYPE, DB_ID, INSIGHT_ID, RESOURCE_METRIC, INTERVAL, TIME_START, TIME_END, SUBTREE]),
    op!("summarize_database_insight_resource_forecast_trend", Opsi, Get, "/databaseInsights/resourceForecastTrend", false,
        "Historical usage with a forecast",
        [COMPARTMENT, DB_TYPE, DB_ID, INSIGHT_ID, RESOURCE_METRIC, INTERVAL, TIME_START, TIME_END, SUBTREE,
         STATISTIC, FORECAST_DAYS, FORECAST_MODEL]),
    op!("summarize_database_insight_resource_utilization_insight", Opsi, Get, "/databaseInsights/resourceUtilizationInsight", false,
        "Databases projected to be high or low utilized",
        [COMPARTMENT, DB_TYPE, DB_ID, INSIGHT_ID, RESOURCE_METRIC, INTERVAL, TIME_START, TIME_END, SUBTREE, FORECAST_DAYS]),
    op!("summarize_sql_statistics", Opsi, Get, "/databaseInsights/sqlStatistics", false,
        "Top SQL by database time with performance categories",
        [COMPARTMENT, DB_TYPE, DB_ID, INSIGHT_ID, INTERVAL, TIME_START, TIME_END, SUBTREE, DB_TIME_PCT, SQL_IDS,
         opt("category", "category", StringList, "Categories such as DEGRADING, VARIANT, INEFFICIENT")]),
    op!("summarize_sql_insights", Opsi, Get, "/databaseInsights/sqlInsights", false,
        "SQL insights (degrading, variant, inefficient SQL) for the fleet",
        [COMPARTMENT, DB_TYPE, DB_ID, INSIGHT_ID, INTERVAL, TIME_START, TIME_END, SUBTREE, DB_TIME_PCT]),
    op!("summarize_sql_plan_insights", Opsi, Get, "/databaseInsights/sqlPlanInsights", false,
        "Plan changes and their performance for one SQL",
        [COMPARTMENT, SQL_ID, opt("database_id", "databaseId", Str, "Database OCID"),
         opt("id", "id", Str, "Database insight OCID"), INTERVAL, TIME_START, TIME_END]),
    op!("summarize_sql_response_time_distributions", Opsi, Get, "/databaseInsights/sqlResponseTimeDistributions", false,
        "Response time buckets for one SQL",
        [COMPARTMENT, SQL_ID, opt("database_id", "databaseId", Str, "Database OCID"),
         opt("id", "id", Str, "Database insight OCID"), INTERVAL, TIME_START, TIME_END]),
    op!("summarize_sql_statistics_time_series", Opsi, Get, "/databaseInsights/sqlStatisticsTimeSeries", false,
        "Time series of statistics for one SQL",
        [COMPARTMENT, SQL_ID, DB_ID, INSIGHT_ID, INTERVAL, TIME_START, TIME_END]),
    op!("list_sql_texts", Opsi, Get, "/databaseInsights/sqlTexts", true,
        "Full SQL text for SQL_IDs",
        [COMPARTMENT, query("sql_identifier", "sqlIdentifier", StringList, true, "SQL_IDs"), DB_ID, INSIGHT_ID]),
    op!("list_sql_plans", Opsi, Get, "/databaseInsights/sqlPlans", true,
        "Execution plan lines for a SQL and plan hashes",
        [COMPARTMENT, SQL_ID, query("plan_hash", "planHash", StringList, true, "Plan hash values"),
         opt("database_id", "databaseId", Str, "Database OCID"), opt("id", "id", Str, "Database insight OCID")]),
    op!("list_sql_searches", Opsi, Get, "/databaseInsights/sqlSearches", true,
        "Databases where a SQL_ID was seen",
        [COMPARTMENT, SQL_ID, INTERVAL, TIME_START, TIME_END]),
    op!("list_database_configurations", Opsi, Get, "/databaseInsights/databaseConfigurations", true,
        "Configuration details of monitored databases",
        [COMPARTMENT, SUBTREE, DB_TYPE, DB_ID,
         opt("database_insight_id", "databaseInsightId", StringList, "Database insight OCIDs")]),
    op!("summarize_addm_db_findings", Opsi, Get, "/databaseInsights/addmDbFindings", false,
        "ADDM findings for databases",
        [COMPARTMENT, DB_ID, INSIGHT_ID, INTERVAL, TIME_START, TIME_END, SUBTREE,
         opt("category_name", "categoryName", Str, "Finding category")]),
    op!("summarize_addm_db_recommendations", Opsi, Get, "/databaseInsights/addmDbRecommendations", false,
        "ADDM recommendations for databases",
        [COMPARTMENT, DB_ID, INSIGHT_ID, INTERVAL, TIME_START, TIME_END, SUBTREE,
         opt("finding_identifier", "findingIdentifier", Str, "Restrict to one finding")]),
    op!("list_addm_dbs", Opsi, Get, "/databaseInsights/addmDbs", true,
        "Databases with ADDM data",
        [COMPARTMENT, DB_ID, INSIGHT_ID, INTERVAL, TIME_START, TIME_END, SUBTREE]),
    // Host insights
    op!("list_host_insights", Opsi, Get, "/hostInsights", true,
        "List host insights",
        [COMPARTMENT, SUBTREE, HOST_TYPE, PLATFORM_TYPE, HOST_INSIGHT_ID, LIFECYCLE, STATUS]),
    op!("get_host_insight", Opsi, Get, "/hostInsights/{hostInsightId}", false,
        "Get one host insight",
        [path("host_insight_id", "hostInsightId", "Host insight OCID")]),
    op!("summarize_host_insight_resource_statistics", Opsi, Get, "/hostInsights/resourceStatistics", false,
        "Resource statistics per host",
        [COMPARTMENT, HOST_RESOURCE_METRIC, HOST_TYPE, PLATFORM_TYPE, HOST_INSIGHT_ID, INTERVAL, TIME_START, TIME_END,
         SUBTREE, PERCENTILE, FORECAST_DAYS]),
    op!("summarize_host_insight_resource_usage", Opsi, Get, "/hostInsights/resourceUsageSummary", false,
        "Aggregated host resource usage",
        [COMPARTMENT, HOST_RESOURCE_METRIC, HOST_TYPE, PLATFORM_TYPE, HOST_INSIGHT_ID, INTERVAL, TIME_START, TIME_END,
         SUBTREE, PERCENTILE]),
    op!("summarize_host_insight_resource_usage_trend", Opsi, Get, "/hostInsights/resourceUsageTrend", false,
        "Host resource usage over time",
        [COMPARTMENT, HOST_RESOURCE_METRIC, HOST_TYPE, PLATFORM_TYPE, HOST_INSIGHT_ID, INTERVAL, TIME_START, TIME_END, SUBTREE]),
    op!("summarize_host_insight_resource_capacity_trend", Opsi, Get, "/hostInsights/resourceCapacityTrend", false,
        "Host capacity over time",
        [COMPARTMENT, HOST_RESOURCE_METRIC, HOST_TYPE, PLATFORM_TYPE, HOST_INSIGHT_ID, INTERVAL, TIME_START, TIME_END, SUBTREE]),
    op!("summarize_host_insight_resource_forecast_trend", Opsi, Get, "/hostInsights/resourceForecastTrend", false,
        "Host usage history with a forecast",
        [COMPARTMENT, HOST_RESOURCE_METRIC, HOST_TYPE, PLATFORM_TYPE, HOST_INSIGHT_ID, INTERVAL, TIME_START, TIME_END,
         SUBTREE, STATISTIC, FORECAST_DAYS, FORECAST_MODEL]),
    op!("summarize_host_insight_top_processes_usage", Opsi, Get, "/hostInsights/topProcessesUsage", false,
        "Top processes on a host by resource",
        [COMPARTMENT, query("id", "id", Str, true, "Host insight OCID"), HOST_RESOURCE_METRIC,
         query("timestamp", "timestamp", Str, true, "RFC 3339 point in time"), INTERVAL, TIME_START, TIME_END]),
    op!("list_host_configurations", Opsi, Get, "/hostInsights/hostConfigurations", true,
        "Configuration details of monitored hosts",
        [COMPARTMENT, SUBTREE, HOST_TYPE, PLATFORM_TYPE,
         opt("host_insight_id", "hostInsightId", StringList, "Host insight OCIDs")]),
    // Exadata insights
    op!("list_exadata_insights", Opsi, Get, "/exadataInsights", true,
        "List Exadata insights",
        [COMPARTMENT, SUBTREE, opt("exadata_type", "exadataType", StringList, "DBMACHINE, EXACS, EXACC"), LIFECYCLE, STATUS]),
    op!("get_exadata_insight", Opsi, Get, "/exadataInsights/{exadataInsightId}", false,
        "Get one Exadata insight",
        [path("exadata_insight_id", "exadataInsightId", "Exadata insight OCID")]),
    op!("summarize_exadata_insight_resource_statistics", Opsi, Get, "/exadataInsights/resourceStatistics", false,
        "Exadata resource statistics",
        [COMPARTMENT, query("resource_type", "resourceType", Str, true, "DATABASE, HOST, STORAGE_SERVER, DISKGROUP"),
         RESOURCE_METRIC, opt("exadata_insight_id", "exadataInsightId", StringList, "Exadata insight OCIDs"),
         INTERVAL, TIME_START, TIME_END, SUBTREE, PERCENTILE]),
    op!("summarize_exadata_insight_resource_capacity_trend", Opsi, Get, "/exadataInsights/resourceCapacityTrend", false,
        "Exadata capacity over time",
        [COMPARTMENT, query("resource_type", "resourceType", Str, true, "DATABASE, HOST, STORAGE_SERVER, DISKGROUP"),
         RESOURCE_METRIC, opt("exadata_insight_id", "exadataInsightId", StringList, "Exadata insight OCIDs"),
         INTERVAL, TIME_START, TIME_END, SUBTREE]),
    op!("list_exadata_configurations", Opsi, Get, "/exadataInsights/exadataConfiguration", true,
        "Configuration of monitored Exadata systems",
        [COMPARTMENT, SUBTREE, opt("exadata_insight_id", "exadataInsightId", StringList, "Exadata insight OCIDs")]),
    // Warehouses, hubs, bridges and the rest of OPSI
    op!("list_operations_insights_warehouses", Opsi, Get, "/operationsInsightsWarehouses", true,
        "List Operations Insights warehouses",
        [COMPARTMENT, LIFECYCLE, DISPLAY_NAME]),
    op!("get_operations_insights_warehouse", Opsi, Get, "/operationsInsightsWarehouses/{operationsInsightsWarehouseId}", false,
        "Get one warehouse",
        [path("operations_insights_warehouse_id", "operationsInsightsWarehouseId", "Warehouse OCID")]),
    op!("list_awr_hubs", Opsi, Get, "/awrHubs", true,
        "List AWR hubs of a warehouse",
        [query("operations_insights_warehouse_id", "operationsInsightsWarehouseId", Str, true, "Warehouse OCID"),
         COMPARTMENT_OPT, LIFECYCLE]),
    op!("list_awr_hub_sources", Opsi, Get, "/awrHubSources", true,
        "List databases feeding an AWR hub",
        [query("awr_hub_id", "awrHubId", Str, true, "AWR hub OCID"), COMPARTMENT_OPT,
         opt("source_type", "sourceType", StringList, "Source types")]),
    op!("summarize_awr_sources_summaries", Opsi, Get, "/awrHubs/{awrHubId}/awrSourcesSummary", false,
        "Snapshot ranges per AWR source in a hub",
        [path("awr_hub_id", "awrHubId", "AWR hub OCID"), COMPARTMENT_OPT, NAME]),
    op!("list_enterprise_manager_bridges", Opsi, Get, "/enterpriseManagerBridges", true,
        "List Enterprise Manager bridges",
        [COMPARTMENT, SUBTREE, LIFECYCLE, DISPLAY_NAME]),
    op!("list_importable_enterprise_manager_entities", Opsi, Get,
        "/enterpriseManagerBridges/{enterpriseManagerBridgeId}/importableEnterpriseManagerEntities", true,
        "Enterprise Manager targets that can be imported",
        [path("enterprise_manager_bridge_id", "enterpriseManagerBridgeId", "Bridge OCID"),
         opt("enterprise_manager_entity_type", "enterpriseManagerEntityType", StringList, "Entity types")]),
    op!("list_importable_agent_entities", Opsi, Get, "/importableAgentEntities", true,
        "Agent-monitored hosts that can be enabled",
        [COMPARTMENT]),
    op!("list_news_reports", Opsi, Get, "/newsReports", true,
        "List scheduled news reports",
        [COMPARTMENT, SUBTREE, LIFECYCLE, STATUS]),
    op!("list_operations_insights_private_endpoints", Opsi, Get, "/operationsInsightsPrivateEndpoints", true,
        "List Operations Insights private endpoints",
        [COMPARTMENT, SUBTREE, VCN, LIFECYCLE, DISPLAY_NAME]),
    op!("list_work_requests", Opsi, Get, "/workRequests", true,
        "List Operations Insights work requests",
        [COMPARTMENT, opt("status", "status", StringList, "Work request status"),
         opt("resource_id", "resourceId", Str, "Resource OCID")]),
    op!("get_work_request", Opsi, Get, "/workRequests/{workRequestId}", false,
        "Get one work request",
        [path("work_request_id", "workRequestId", "Work request OCID")]),
    op!("query_opsi_data_object_data", Opsi, Post, "/opsiDataObjects/actions/queryData", false,
        "Run a query against an OPSI data object",
        [COMPARTMENT, Param {
            name: "query_details",
            wire: "queryDetails",
            location: ParamLocation::Body,
            kind: ParamKind::Object,
            required: true,
            description: "QueryOpsiDataObjectDataDetails request body",
        }]),
    // Database Management
    op!("list_managed_databases", Dbm, Get, "/managedDatabases", true,
        "List managed databases",
        [COMPARTMENT, opt("id", "id", Str, "Managed database OCID"), NAME,
         opt("management_option", "managementOption", Str, "BASIC or ADVANCED"),
         opt("deployment_type", "deploymentType", Str, "ONPREMISE, BM, VM, EXADATA, EXADATA_CC, AUTONOMOUS")]),
    op!("get_managed_database", Dbm, Get, "/managedDatabases/{managedDatabaseId}", false,
        "Get one managed database",
        [MANAGED_DB]),
    op!("list_managed_database_groups", Dbm, Get, "/managedDatabaseGroups", true,
        "List managed database groups",
        [COMPARTMENT, opt("id", "id", Str, "Group OCID"), NAME, LIFECYCLE_ONE]),
    op!("get_managed_database_group", Dbm, Get, "/managedDatabaseGroups/{managedDatabaseGroupId}", false,
        "Get one managed database group",
        [path("managed_database_group_id", "managedDatabaseGroupId", "Group OCID")]),
    op!("get_database_fleet_health_metrics", Dbm, Get, "/fleetMetrics", false,
        "Fleet health metrics compared between two points in time",
        [query("compare_baseline_time", "compareBaselineTime", Str, true, "Baseline time, RFC 3339"),
         query("compare_target_time", "compareTargetTime", Str, true, "Target time, RFC 3339"),
         COMPARTMENT_OPT,
         opt("managed_database_group_id", "managedDatabaseGroupId", Str, "Group OCID"),
         opt("compare_type", "compareType", Str, "HOUR or DAY"),
         opt("filter_by_metric_names", "filterByMetricNames", Str, "Comma separated metric names"),
         opt("filter_by_database_type", "filterByDatabaseType", Str, "Database type filter"),
         opt("filter_by_database_deployment_type", "filterByDatabaseDeploymentType", Str, "Deployment type filter")]),
    op!("get_database_home_metrics", Dbm, Get, "/managedDatabases/{managedDatabaseId}/homeMetrics", false,
        "Summary metrics for one managed database",
        [MANAGED_DB, query("start_time", "startTime", Str, true, "RFC 3339 start"),
         query("end_time", "endTime", Str, true, "RFC 3339 end")]),
    op!("list_tablespaces", Dbm, Get, "/managedDatabases/{managedDatabaseId}/tablespaces", true,
        "Tablespaces of a managed database",
        [MANAGED_DB, NAME]),
    op!("get_tablespace", Dbm, Get, "/managedDatabases/{managedDatabaseId}/tablespaces/{tablespaceName}", false,
        "Details of one tablespace",
        [MANAGED_DB, path("tablespace_name", "tablespaceName", "Tablespace name")]),
    op!("list_users", Dbm, Get, "/managedDatabases/{managedDatabaseId}/users", true,
        "Database users",
        [MANAGED_DB, NAME]),
    op!("get_user", Dbm, Get, "/managedDatabases/{managedDatabaseId}/users/{userName}", false,
        "Details of one database user",
        [MANAGED_DB, USER_NAME]),
    op!("list_roles", Dbm, Get, "/managedDatabases/{managedDatabaseId}/users/{userName}/roles", true,
        "Roles granted to a user",
        [MANAGED_DB, USER_NAME, NAME]),
    op!("list_system_privileges", Dbm, Get, "/managedDatabases/{managedDatabaseId}/users/{userName}/systemPrivileges", true,
        "System privileges granted to a user",
        [MANAGED_DB, USER_NAME, NAME]),
    op!("list_object_privileges", Dbm, Get, "/managedDatabases/{managedDatabaseId}/users/{userName}/objectPrivileges", true,
        "Object privileges granted to a user",
        [MANAGED_DB, USER_NAME, NAME]),
    op!("list_proxy_users", Dbm, Get, "/managedDatabases/{managedDatabaseId}/users/{userName}/proxyUsers", true,
        "Proxy users for a user",
        [MANAGED_DB, USER_NAME, NAME]),
    op!("list_consumer_group_privileges", Dbm, Get,
        "/managedDatabases/{managedDatabaseId}/users/{userName}/consumerGroupPrivileges", true,
        "Consumer group privileges granted to a user",
        [MANAGED_DB, USER_NAME, NAME]),
    op!("list_database_profiles", Dbm, Get, "/managedDatabases/{managedDatabaseId}/profiles", true,
        "Database profiles (resource and password limits)",
        [MANAGED_DB, NAME]),
    op!("list_database_parameters", Dbm, Get, "/managedDatabases/{managedDatabaseId}/databaseParameters", true,
        "Initialization parameters",
        [MANAGED_DB, opt("source", "source", Str, "CURRENT or SPFILE"), NAME,
         opt("is_allowed_values_included", "isAllowedValuesIncluded", Boolean, "Include allowed values")]),
    op!("list_awr_dbs", Dbm, Get, "/managedDatabases/{managedDatabaseId}/awrDbs", true,
        "AWR databases of a managed database",
        [MANAGED_DB, NAME, TIME_GTE, TIME_LTE]),
    op!("list_awr_db_snapshots", Dbm, Get, "/managedDatabases/{managedDatabaseId}/awrDbs/{awrDbId}/awrDbSnapshots", true,
        "AWR snapshots",
        [MANAGED_DB, AWR_DB, INST_NUM, BEGIN_SN, END_SN, TIME_GTE, TIME_LTE,
         opt("container_id", "containerId", Integer, "Container id")]),
    op!("summarize_awr_db_top_wait_events", Dbm, Get, "/managedDatabases/{managedDatabaseId}/awrDbs/{awrDbId}/awrDbTopWaitEvents", false,
        "Top wait events in an AWR range",
        [MANAGED_DB, AWR_DB, INST_NUM, BEGIN_SN, END_SN, TIME_GTE, TIME_LTE,
         opt("top_n", "topN", Integer, "Number of events")]),
    op!("list_alert_logs", Dbm, Get, "/managedDatabases/{managedDatabaseId}/alertLogs", true,
        "Alert log entries",
        [MANAGED_DB, TIME_GTE, TIME_LTE,
         opt("level_filter", "levelFilter", Str, "CRITICAL, SEVERE, IMPORTANT, NORMAL, ALL"),
         opt("type_filter", "typeFilter", Str, "UNKNOWN, INCIDENT_ERROR, ERROR, WARNING, NOTIFICATION, TRACE, ALL"),
         opt("log_search_text", "logSearchText", Str, "Text to search"),
         opt("is_regular_expression", "isRegularExpression", Boolean, "Treat search text as a regex")]),
    op!("list_attention_logs", Dbm, Get, "/managedDatabases/{managedDatabaseId}/attentionLogs", true,
        "Attention log entries",
        [MANAGED_DB, TIME_GTE, TIME_LTE,
         opt("urgency_filter", "urgencyFilter", Str, "IMMEDIATE, SOON, DEFERRABLE, INFO, ALL"),
         opt("type_filter", "typeFilter", Str, "Message type filter"),
         opt("log_search_text", "logSearchText", Str, "Text to search"),
         opt("is_regular_expression", "isRegularExpression", Boolean, "Treat search text as a regex")]),
    op!("list_sql_tuning_advisor_tasks", Dbm, Get, "/managedDatabases/{managedDatabaseId}/sqlTuningAdvisorTasks", true,
        "SQL Tuning Advisor tasks",
        [MANAGED_DB, NAME, opt("status", "status", Str, "Task status"), TIME_GTE, TIME_LTE]),
    op!("list_sql_plan_baselines", Dbm, Get, "/managedDatabases/{managedDatabaseId}/sqlPlanBaselines", true,
        "SQL plan baselines",
        [MANAGED_DB, opt("plan_name", "planName", Str, "Plan name"), opt("sql_handle", "sqlHandle", Str, "SQL handle"),
         opt("sql_text", "sqlText", Str, "SQL text filter"), opt("is_enabled", "isEnabled", Boolean, "Enabled only"),
         opt("is_accepted", "isAccepted", Boolean, "Accepted only")]),
    op!("list_cursor_cache_statements", Dbm, Get, "/managedDatabases/{managedDatabaseId}/cursorCacheStatements", true,
        "Statements in the cursor cache",
        [MANAGED_DB, opt("sql_text", "sqlText", Str, "SQL text filter")]),
    op!("list_preferred_credentials", Dbm, Get, "/managedDatabases/{managedDatabaseId}/preferredCredentials", true,
        "Preferred credentials set for a managed database",
        [MANAGED_DB]),
    op!("list_jobs", Dbm, Get, "/jobs", true,
        "Database Management jobs",
        [COMPARTMENT_OPT, opt("managed_database_id", "managedDatabaseId", Str, "Managed database OCID"),
         opt("managed_database_group_id", "managedDatabaseGroupId", Str, "Group OCID"), NAME, LIFECYCLE_ONE]),
    op!("list_job_executions", Dbm, Get, "/jobExecutions", true,
        "Executions of Database Management jobs",
        [COMPARTMENT, opt("job_id", "jobId", Str, "Job OCID"),
         opt("managed_database_id", "managedDatabaseId", Str, "Managed database OCID"),
         opt("status", "status", Str, "Execution status")]),
    op!("list_external_db_systems", Dbm, Get, "/externalDbSystems", true,
        "External DB systems",
        [COMPARTMENT, DISPLAY_NAME, LIFECYCLE_ONE]),
    op!("get_external_db_system", Dbm, Get, "/externalDbSystems/{externalDbSystemId}", false,
        "Get one external DB system",
        [path("external_db_system_id", "externalDbSystemId", "External DB system OCID")]),
    op!("list_db_management_private_endpoints", Dbm, Get, "/dbManagementPrivateEndpoints", true,
        "Database Management private endpoints",
        [COMPARTMENT, NAME, VCN, opt("is_cluster", "isCluster", Boolean, "RAC private endpoints only"), LIFECYCLE_ONE]),
    // Identity
    op!("get_tenancy", Identity, Get, "/tenancies/{tenancyId}", false,
        "Tenancy details",
        [path("tenancy_id", "tenancyId", "Tenancy OCID")]),
    op!("list_region_subscriptions", Identity, Get, "/tenancies/{tenancyId}/regionSubscriptions", true,
        "Regions the tenancy is subscribed to",
        [path("tenancy_id", "tenancyId", "Tenancy OCID")]),
    op!("list_regions", Identity, Get, "/regions", true,
        "All commercially available regions",
        []),
    op!("list_compartments", Identity, Get, "/compartments", true,
        "Compartments under a parent",
        [COMPARTMENT, SUBTREE, opt("access_level", "accessLevel", Str, "ANY or ACCESSIBLE"), NAME, LIFECYCLE_ONE]),
    op!("get_compartment", Identity, Get, "/compartments/{compartmentId}", false,
        "Get one compartment",
        [path("compartment_id", "compartmentId", "Compartment OCID")]),
    op!("list_availability_domains", Identity, Get, "/availabilityDomains", true,
        "Availability domains of the region",
        [COMPARTMENT]),
    // Database service
    op!("list_autonomous_databases", Database, Get, "/autonomousDatabases", true,
        "Autonomous databases",
        [COMPARTMENT, opt("db_workload", "dbWorkload", Str, "OLTP, DW, AJD, APEX"), LIFECYCLE_ONE, DISPLAY_NAME]),
    op!("get_autonomous_database", Database, Get, "/autonomousDatabases/{autonomousDatabaseId}", false,
        "Get one autonomous database",
        [path("autonomous_database_id", "autonomousDatabaseId", "Autonomous database OCID")]),
    op!("list_db_systems", Database, Get, "/dbSystems", true,
        "DB systems (bare metal, VM, Exadata)",
        [COMPARTMENT, LIFECYCLE_ONE, DISPLAY_NAME]),
    op!("get_db_system", Database, Get, "/dbSystems/{dbSystemId}", false,
        "Get one DB system",
        [path("db_system_id", "dbSystemId", "DB system OCID")]),
    op!("list_databases", Database, Get, "/databases", true,
        "Databases in a DB home or system",
        [COMPARTMENT, opt("db_home_id", "dbHomeId", Str, "DB home OCID"), opt("system_id", "systemId", Str, "Exadata VM cluster OCID"),
         opt("db_name", "dbName", Str, "Database name"), LIFECYCLE_ONE]),
    op!("get_database", Database, Get, "/databases/{databaseId}", false,
        "Get one database",
        [path("database_id", "databaseId", "Database OCID")]),
];

/// Look up an operation by tool name
pub fn operation(name: &str) -> Option<&'static ApiOperation> {
    OPERATIONS.iter().find(|op| op.name == name)
}
