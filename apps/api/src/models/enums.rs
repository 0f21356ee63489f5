//! Postgres enum types shared by the models.
//!
//! Every enum is stored and serialized by its snake_case code. The display
//! label is what the web client shows, and form input accepts either one.

use serde::{Deserialize, Serialize};

macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident => $pg_type:literal {
            $($variant:ident = ($code:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(type_name = $pg_type)]
        pub enum $name {
            $(
                #[sqlx(rename = $code)]
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Accepts either the code or the display label.
            pub fn parse_input(raw: &str) -> Option<Self> {
                let raw = raw.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.code() == raw || v.label() == raw)
            }
        }
    };
}

labeled_enum! {
    Gender => "gender_enum" {
        Male = ("male", "남성"),
        Female = ("female", "여성"),
    }
}

labeled_enum! {
    /// Minimum education a posting asks for.
    Education => "education_enum" {
        NoRequirement = ("none", "학력 무관"),
        HighSchool = ("high", "고졸"),
        College2 = ("college_2", "초대졸"),
        College4 = ("college_4", "대졸"),
        Graduate = ("graduate", "대학원"),
    }
}

labeled_enum! {
    PaymentMethod => "payment_method_enum" {
        Hourly = ("hourly", "시급"),
        Daily = ("daily", "일급"),
        Weekly = ("weekly", "주급"),
        Monthly = ("monthly", "월급"),
        Yearly = ("yearly", "연봉"),
    }
}

labeled_enum! {
    JobCategory => "job_category_enum" {
        Food = ("food", "외식·음료"),
        Sales = ("sales", "유통·판매"),
        Culture = ("culture", "문화·여가·생활"),
        Service = ("service", "서비스"),
        Admin = ("admin", "사무·회계"),
        Cs = ("cs", "고객상담·영업·리서치"),
        Labor = ("labor", "생산·건설·노무"),
        It = ("it", "IT·인터넷"),
        Education = ("education", "교육·강사"),
        Design = ("design", "디자인"),
        Media = ("media", "미디어"),
        Delivery = ("delivery", "운전·배달"),
        Medical = ("medical", "병원·간호·연구"),
        ProConsult = ("pro_consult", "전문-상담직"),
        ProAdmin = ("pro_admin", "전문-사무직"),
        ProBar = ("pro_bar", "전문-BAR"),
        ProLabor = ("pro_labor", "전문-생산직"),
        ProFood = ("pro_food", "전문-외식업"),
    }
}

labeled_enum! {
    WorkDuration => "work_duration_enum" {
        More3Months = ("more_3_months", "3개월 이상"),
        More6Months = ("more_6_months", "6개월 이상"),
        More1Year = ("more_1_year", "1년 이상"),
        More3Years = ("more_3_years", "3년 이상"),
        Negotiable = ("negotiable", "협의 가능"),
    }
}

labeled_enum! {
    ApplicationStatus => "application_status_enum" {
        Applied = ("applied", "지원완료"),
        Passed = ("passed", "서류통과"),
        Accepted = ("accepted", "합격"),
        Rejected = ("rejected", "불합격"),
    }
}

labeled_enum! {
    EducationType => "education_type_enum" {
        HighSchool = ("high_school", "고등학교"),
        College2To3 = ("college_2_3", "대학교(2,3년)"),
        College4 = ("college_4", "대학교(4년)"),
        Graduate = ("graduate", "대학원"),
    }
}

labeled_enum! {
    EducationStatus => "education_status_enum" {
        Graduated = ("graduated", "졸업"),
        Studying = ("studying", "재학중"),
        OnLeave = ("on_leave", "휴학"),
        Expected = ("expected", "예정"),
    }
}

/// One selectable value for a form field.
#[derive(Debug, Clone, Serialize)]
pub struct EnumOption {
    pub value: &'static str,
    pub label: &'static str,
}

macro_rules! options_of {
    ($name:ident) => {
        $name::ALL
            .iter()
            .map(|v| EnumOption {
                value: v.code(),
                label: v.label(),
            })
            .collect::<Vec<_>>()
    };
}

/// All enum options a posting form needs.
#[derive(Debug, Clone, Serialize)]
pub struct PostingFormOptions {
    pub education: Vec<EnumOption>,
    pub payment_method: Vec<EnumOption>,
    pub job_category: Vec<EnumOption>,
    pub work_duration: Vec<EnumOption>,
}

impl PostingFormOptions {
    pub fn build() -> Self {
        PostingFormOptions {
            education: options_of!(Education),
            payment_method: options_of!(PaymentMethod),
            job_category: options_of!(JobCategory),
            work_duration: options_of!(WorkDuration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_code_and_label() {
        assert_eq!(Education::parse_input("college_4"), Some(Education::College4));
        assert_eq!(Education::parse_input("대졸"), Some(Education::College4));
        assert_eq!(JobCategory::parse_input(" it "), Some(JobCategory::It));
        assert_eq!(JobCategory::parse_input("IT·인터넷"), Some(JobCategory::It));
        assert_eq!(PaymentMethod::parse_input("weekly"), Some(PaymentMethod::Weekly));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(WorkDuration::parse_input("forever"), None);
        assert_eq!(Education::parse_input(""), None);
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&WorkDuration::More1Year).unwrap();
        assert_eq!(json, "\"more_1_year\"");
        let back: Education = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(back, Education::NoRequirement);
    }

    #[test]
    fn test_form_options_cover_every_variant() {
        let options = PostingFormOptions::build();
        assert_eq!(options.job_category.len(), JobCategory::ALL.len());
        assert_eq!(options.education[0].value, "none");
        assert_eq!(options.education[0].label, "학력 무관");
    }
}
