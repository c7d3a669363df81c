//! Exam catalog offered to clients picking what to scrape.
//!
//! The built-in catalog can be replaced wholesale through the `catalog` key of
//! the JSON config file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One category: a display name and its exams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub name: String,
    #[serde(default)]
    pub exams: Vec<String>,
}

/// Categories keyed by slug (`aws`, `azure`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamCatalog {
    categories: BTreeMap<String, CatalogCategory>,
}

impl ExamCatalog {
    pub fn new(categories: BTreeMap<String, CatalogCategory>) -> Self {
        Self { categories }
    }

    /// Slug to display name, for every category.
    pub fn category_names(&self) -> BTreeMap<&str, &str> {
        self.categories
            .iter()
            .map(|(slug, c)| (slug.as_str(), c.name.as_str()))
            .collect()
    }

    /// Exams for `slug`; unknown categories have none.
    pub fn exams(&self, slug: &str) -> &[String] {
        self.categories
            .get(slug)
            .map(|c| c.exams.as_slice())
            .unwrap_or_default()
    }
}

impl Default for ExamCatalog {
    fn default() -> Self {
        let categories = BUILT_IN
            .iter()
            .map(|(slug, name, exams)| {
                let category = CatalogCategory {
                    name: name.to_string(),
                    exams: exams.iter().map(|e| e.to_string()).collect(),
                };
                (slug.to_string(), category)
            })
            .collect();
        Self { categories }
    }
}

const BUILT_IN: &[(&str, &str, &[&str])] = &[
    (
        "amazon",
        "Amazon AWS Certifications",
        &[
            "AWS Certified Solutions Architect Associate (SAA-C03)",
            "AWS Certified Solutions Architect Professional (SAP-C02)",
            "AWS Certified Developer Associate (DVA-C02)",
            "AWS Certified SysOps Administrator Associate (SOA-C02)",
            "AWS Certified Cloud Practitioner (CLF-C02)",
            "AWS Certified DevOps Engineer Professional (DOP-C02)",
            "AWS Certified Security Specialty (SCS-C02)",
            "AWS Certified Advanced Networking Specialty (ANS-C01)",
            "AWS Certified Database Specialty (DBS-C01)",
            "AWS Certified Data Analytics Specialty (DAS-C01)",
            "AWS Certified Machine Learning Specialty (MLS-C01)",
        ],
    ),
    (
        "aws",
        "AWS Certifications",
        &[
            "AWS Certified Solutions Architect Associate (SAA-C03)",
            "AWS Certified Developer Associate (DVA-C02)",
            "AWS Certified SysOps Administrator Associate (SOA-C02)",
            "AWS Certified Cloud Practitioner (CLF-C02)",
        ],
    ),
    (
        "azure",
        "Microsoft Azure",
        &[
            "AZ-900: Microsoft Azure Fundamentals",
            "AZ-104: Microsoft Azure Administrator",
            "AZ-204: Developing Solutions for Microsoft Azure",
            "AZ-305: Designing Microsoft Azure Infrastructure Solutions",
        ],
    ),
    (
        "cisco",
        "Cisco Certifications",
        &[
            "CCNA: Cisco Certified Network Associate",
            "CCNP: Cisco Certified Network Professional",
            "CCIE: Cisco Certified Internetwork Expert",
        ],
    ),
    (
        "comptia",
        "CompTIA Certifications",
        &[
            "CompTIA A+",
            "CompTIA Network+",
            "CompTIA Security+",
            "CompTIA Cloud+",
        ],
    ),
    (
        "gcp",
        "Google Cloud Platform",
        &[
            "Google Cloud Professional Cloud Architect",
            "Google Cloud Professional Data Engineer",
            "Google Cloud Professional Cloud Developer",
            "Google Cloud Associate Cloud Engineer",
        ],
    ),
    (
        "microsoft",
        "Microsoft Certifications",
        &[
            "AZ-900: Microsoft Azure Fundamentals",
            "AZ-104: Microsoft Azure Administrator",
            "AZ-204: Developing Solutions for Microsoft Azure",
            "AZ-305: Designing Microsoft Azure Infrastructure Solutions",
            "AZ-400: Microsoft Azure DevOps Solutions",
            "AZ-500: Microsoft Azure Security Technologies",
            "AZ-700: Designing and Implementing Microsoft Azure Networking Solutions",
            "AI-102: Designing and Implementing a Microsoft Azure AI Solution",
            "AI-900: Microsoft Azure AI Fundamentals",
            "DP-100: Designing and Implementing a Data Science Solution on Azure",
            "DP-203: Data Engineering on Microsoft Azure",
            "DP-300: Administering Relational Databases on Microsoft Azure",
            "DP-900: Microsoft Azure Data Fundamentals",
            "MS-102: Microsoft 365 Administrator",
            "MS-900: Microsoft 365 Fundamentals",
            "PL-300: Microsoft Power BI Data Analyst",
            "PL-900: Microsoft Power Platform Fundamentals",
            "SC-100: Microsoft Cybersecurity Architect",
            "SC-200: Microsoft Security Operations Analyst",
            "SC-300: Microsoft Identity and Access Administrator",
            "SC-900: Microsoft Security, Compliance, and Identity Fundamentals",
        ],
    ),
];
