// Built-in layouts for each district's certified-roll extract.

use appraisal_common::{District, Field};

use crate::layout::{Layout, RowFilter};

/// How repeated auxiliary rows for one account fold together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Later rows replace earlier ones.
    Last,
    /// Keep the largest building area and the earliest non-zero year built,
    /// for extracts with one row per improvement.
    MainImprovement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuxSource {
    pub layout: Layout,
    pub aggregate: Aggregate,
}

/// Everything needed to ingest one district: the streamed primary file and
/// the side files joined into it by account.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestPlan {
    pub district: District,
    pub primary: Layout,
    pub aux: Vec<AuxSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    pub appraisal_year: String,
    /// Import every property class instead of residential only (HCAD).
    pub all_classes: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            appraisal_year: "2025".to_string(),
            all_classes: false,
        }
    }
}

impl IngestPlan {
    pub fn for_district(district: District, settings: &IngestSettings) -> Self {
        match district {
            District::Hcad => hcad(settings),
            District::Dcad => dcad(settings),
            District::Ccad => ccad(),
            District::Tad => tad(),
            District::Tcad => tcad(),
        }
    }

    /// Replace the primary layout, keeping the auxiliary joins.
    pub fn with_primary(mut self, layout: Layout) -> Self {
        self.primary = layout;
        self
    }

    /// A plan with no auxiliary files.
    pub fn single(district: District, layout: Layout) -> Self {
        Self {
            district,
            primary: layout,
            aux: Vec::new(),
        }
    }
}

fn hcad(settings: &IngestSettings) -> IngestPlan {
    let mut primary = Layout::delimited("hcad-real-acct", '\t')
        .column(Field::AccountNumber, "acct")
        .column(Field::SitusAddress, "site_addr_1")
        .column(Field::City, "site_addr_2")
        .column(Field::Zip, "site_addr_3")
        .column(Field::AppraisedValue, "tot_appr_val")
        .column(Field::MarketValue, "tot_mkt_val")
        .column(Field::LandValue, "land_val")
        .column(Field::BuildingArea, "bld_ar")
        .column(Field::YearBuilt, "yr_impr")
        .column(Field::NeighborhoodCode, "Neighborhood_Code")
        .column(Field::StateClass, "state_class")
        .column(Field::OwnerName, "mailto");
    if !settings.all_classes {
        primary = primary.filter(RowFilter::ResidentialOnly);
    }
    IngestPlan::single(District::Hcad, primary)
}

fn appraisal_year(settings: &IngestSettings) -> RowFilter {
    RowFilter::Equals {
        field: Field::AppraisalYear,
        value: settings.appraisal_year.clone(),
    }
}

fn dcad(settings: &IngestSettings) -> IngestPlan {
    let primary = Layout::delimited("dcad-account-info", ',')
        .column(Field::AccountNumber, "ACCOUNT_NUM")
        .column(Field::AppraisalYear, "APPRAISAL_YR")
        .column(Field::StreetNumber, "STREET_NUM")
        .column(Field::StreetHalfNumber, "STREET_HALF_NUM")
        .column(Field::StreetName, "FULL_STREET_NAME")
        .column(Field::Unit, "UNIT_ID")
        .column(Field::City, "PROPERTY_CITY")
        .column(Field::Zip, "PROPERTY_ZIPCODE")
        .column(Field::NeighborhoodCode, "NBHD_CD")
        .column(Field::StateClass, "DIVISION_CD")
        .column(Field::OwnerName, "OWNER_NAME1")
        .filter(appraisal_year(settings));

    let values = Layout::delimited("dcad-account-apprl-year", ',')
        .column(Field::AccountNumber, "ACCOUNT_NUM")
        .column(Field::AppraisalYear, "APPRAISAL_YR")
        .column(Field::AppraisedValue, "TOT_VAL")
        .column(Field::MarketValue, "PREV_MKT_VAL")
        .column(Field::LandValue, "LAND_VAL")
        .filter(appraisal_year(settings));

    let buildings = Layout::delimited("dcad-res-detail", ',')
        .column(Field::AccountNumber, "ACCOUNT_NUM")
        .column(Field::AppraisalYear, "APPRAISAL_YR")
        .column(Field::BuildingArea, "TOT_LIVING_AREA_SF")
        .column(Field::YearBuilt, "YR_BUILT")
        .filter(appraisal_year(settings));

    IngestPlan {
        district: District::Dcad,
        primary,
        aux: vec![
            AuxSource {
                layout: values,
                aggregate: Aggregate::Last,
            },
            AuxSource {
                layout: buildings,
                aggregate: Aggregate::MainImprovement,
            },
        ],
    }
}

fn ccad() -> IngestPlan {
    let primary = Layout::delimited("ccad-certified", ',')
        .column(Field::AccountNumber, "propID")
        .column(Field::RecordType, "propType")
        .column(Field::SitusAddress, "situsConcat")
        .column(Field::AppraisedValue, "currValAppraised")
        .column(Field::MarketValue, "currValMarket")
        .column(Field::LandValue, "currValLand")
        .column(Field::BuildingArea, "imprvMainArea")
        .column(Field::YearBuilt, "imprvYearBuilt")
        .column(Field::NeighborhoodCode, "nbhdCode")
        .column(Field::StateClass, "propCategoryCode")
        .column(Field::OwnerName, "ownerName")
        .filter(RowFilter::Equals {
            field: Field::RecordType,
            value: "real".to_string(),
        });
    IngestPlan::single(District::Ccad, primary)
}

fn tad() -> IngestPlan {
    let primary = Layout::delimited("tad-certified", '|')
        .column(Field::AccountNumber, "Account_Num")
        .column(Field::SitusAddress, "Situs_Address")
        .column(Field::CityState, "Owner_CityState")
        .column(Field::Zip, "Owner_Zip")
        .column(Field::AppraisedValue, "Appraised_Value")
        .column(Field::MarketValue, "Total_Value")
        .column(Field::LandValue, "Land_Value")
        .column(Field::BuildingArea, "Living_Area")
        .column(Field::YearBuilt, "Year_Built")
        // No neighborhood column in the extract; the map grid stands in.
        .column(Field::NeighborhoodCode, "TAD_Map")
        .column(Field::StateClass, "Property_Class")
        .column(Field::OwnerName, "Owner_Name")
        .filter(RowFilter::NonEmpty {
            field: Field::SitusAddress,
        });
    IngestPlan::single(District::Tad, primary)
}

fn tcad() -> IngestPlan {
    let primary = Layout::fixed_width("tcad-prop")
        .range(Field::AccountNumber, 0, 12)
        .range(Field::RecordType, 12, 17)
        .range(Field::StreetPrefix, 1039, 1049)
        .range(Field::StreetName, 1049, 1099)
        .range(Field::StreetSuffix, 1099, 1109)
        .range(Field::City, 1109, 1139)
        .range(Field::Zip, 1139, 1149)
        .range(Field::NeighborhoodCode, 1685, 1695)
        .range(Field::AppraisedValue, 1915, 1930)
        .range(Field::MarketValue, 4213, 4227)
        .range(Field::StreetNumber, 4459, 4474)
        .filter(RowFilter::Equals {
            field: Field::RecordType,
            value: "R".to_string(),
        })
        .filter(RowFilter::NumberedStreet);

    let improvements = Layout::fixed_width("tcad-imp-det")
        .range(Field::AccountNumber, 0, 12)
        .range(Field::YearBuilt, 85, 89)
        .range(Field::BuildingArea, 93, 108);

    IngestPlan {
        district: District::Tcad,
        primary,
        aux: vec![AuxSource {
            layout: improvements,
            aggregate: Aggregate::MainImprovement,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SourceFormat;

    #[test]
    fn every_district_has_a_keyed_plan() {
        let settings = IngestSettings::default();
        for district in District::ALL {
            let plan = IngestPlan::for_district(district, &settings);
            assert_eq!(plan.district, district);
            assert!(plan
                .primary
                .columns
                .iter()
                .any(|c| c.field == Field::AccountNumber));
        }
    }

    #[test]
    fn hcad_class_filter_is_optional() {
        let plan = IngestPlan::for_district(District::Hcad, &IngestSettings::default());
        assert_eq!(plan.primary.filters, vec![RowFilter::ResidentialOnly]);

        let all = IngestSettings {
            all_classes: true,
            ..IngestSettings::default()
        };
        assert!(IngestPlan::for_district(District::Hcad, &all).primary.filters.is_empty());
    }

    #[test]
    fn dcad_filters_every_file_by_year() {
        let settings = IngestSettings {
            appraisal_year: "2024".into(),
            ..IngestSettings::default()
        };
        let plan = IngestPlan::for_district(District::Dcad, &settings);
        let year = RowFilter::Equals {
            field: Field::AppraisalYear,
            value: "2024".into(),
        };
        assert!(plan.primary.filters.contains(&year));
        assert_eq!(plan.aux.len(), 2);
        assert!(plan.aux.iter().all(|a| a.layout.filters.contains(&year)));
    }

    #[test]
    fn tcad_is_fixed_width_with_improvement_join() {
        let plan = IngestPlan::for_district(District::Tcad, &IngestSettings::default());
        assert_eq!(plan.primary.format, SourceFormat::FixedWidth);
        assert_eq!(plan.aux[0].aggregate, Aggregate::MainImprovement);
    }
}
