//! Compiled-in fallback content.
//!
//! These values render whenever the store is unconfigured, unreachable, or
//! holds no items for a collection. They also seed sample data on request.

use crate::model::content::{BentoCategory, BentoItem, EducationItem, Profile, Project, Skill};

pub fn default_profile() -> Profile {
    Profile {
        name: "Nishant Srivastava".to_string(),
        title: "Data Scientist & ML Engineer".to_string(),
        bio: "I build predictive models, ML pipelines, and GenAI applications that solve \
              real-world problems. Specializing in Python, Machine Learning, and LLM-powered \
              solutions."
            .to_string(),
        email: "nishant0753@gmail.com".to_string(),
        linkedin: "https://linkedin.com/in/nishant-srivastava".to_string(),
        github: "https://github.com/nish0753".to_string(),
        available_for_work: true,
    }
}

const DEFAULT_SKILLS: &[(&str, &str)] = &[
    ("Python", "Core Skills"),
    ("SQL", "Core Skills"),
    ("Pandas", "Core Skills"),
    ("NumPy", "Core Skills"),
    ("Data Cleaning & EDA", "Core Skills"),
    ("Machine Learning", "Core Skills"),
    ("Scikit-learn", "ML & AI"),
    ("Feature Engineering", "ML & AI"),
    ("Model Evaluation", "ML & AI"),
    ("Generative AI (LLMs)", "ML & AI"),
    ("Prompt Engineering", "ML & AI"),
    ("RAG", "ML & AI"),
    ("Git & GitHub", "Tools"),
    ("Jupyter Notebook", "Tools"),
    ("Streamlit", "Tools"),
    ("Flask", "Tools"),
];

pub fn default_skills() -> Vec<Skill> {
    DEFAULT_SKILLS
        .iter()
        .enumerate()
        .map(|(index, (name, category))| Skill {
            id: (index + 1).to_string(),
            name: (*name).to_string(),
            category: (*category).to_string(),
            order: index as i64,
        })
        .collect()
}

pub fn default_education() -> Vec<EducationItem> {
    vec![
        EducationItem {
            id: "1".to_string(),
            degree: "Bachelor of Science".to_string(),
            school: "University Name".to_string(),
            field: "Computer Science".to_string(),
            year: "2018 - 2022".to_string(),
            description: "Specialized in Web Development and Software Engineering with focus \
                          on full-stack development"
                .to_string(),
            icon: "GraduationCap".to_string(),
            certificate_url: None,
            order: 0,
        },
        EducationItem {
            id: "2".to_string(),
            degree: "Advanced Certification".to_string(),
            school: "Online Platform".to_string(),
            field: "Full-Stack Development".to_string(),
            year: "2022 - 2023".to_string(),
            description: "Comprehensive training in React, Node.js, and modern web development \
                          practices"
                .to_string(),
            icon: "BookOpen".to_string(),
            certificate_url: Some(String::new()),
            order: 1,
        },
        EducationItem {
            id: "3".to_string(),
            degree: "Professional Diploma".to_string(),
            school: "Training Institute".to_string(),
            field: "UI/UX Design".to_string(),
            year: "2023".to_string(),
            description: "Mastered design principles, prototyping, and user-centered design \
                          methodology"
                .to_string(),
            icon: "Award".to_string(),
            certificate_url: None,
            order: 2,
        },
    ]
}

fn bento(
    id: &str,
    title: &str,
    description: &str,
    icon: &str,
    category: BentoCategory,
    order: i64,
) -> BentoItem {
    BentoItem {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        category,
        order,
        technologies: None,
    }
}

pub fn default_bento_items() -> Vec<BentoItem> {
    let mut main = bento(
        "1",
        "Data Science & Machine Learning",
        "I build predictive models and data pipelines that solve real business problems. \
         From exploratory analysis to production-ready ML systems, I turn raw data into \
         actionable insights using Python, SQL, and modern ML frameworks.",
        "Code2",
        BentoCategory::Main,
        0,
    );
    main.technologies = Some(
        ["Python", "SQL", "Pandas", "Scikit-learn", "Streamlit"]
            .iter()
            .map(|tech| (*tech).to_string())
            .collect(),
    );

    vec![
        main,
        bento(
            "2",
            "Generative AI & LLMs",
            "Building AI agents, RAG systems, and LLM-powered applications",
            "Sparkles",
            BentoCategory::Skill,
            1,
        ),
        bento(
            "3",
            "ML Model Development",
            "Feature engineering, model training, and evaluation",
            "Zap",
            BentoCategory::Skill,
            2,
        ),
        bento(
            "4",
            "End-to-End Deployment",
            "From Jupyter notebooks to production APIs",
            "Rocket",
            BentoCategory::Skill,
            3,
        ),
        bento(
            "5",
            "Full-Stack for AI",
            "React, Node.js, and cloud services to deploy ML products",
            "Globe",
            BentoCategory::Skill,
            4,
        ),
        bento(
            "6",
            "Data Engineering",
            "ETL pipelines and data infrastructure",
            "Layers",
            BentoCategory::Skill,
            5,
        ),
    ]
}

fn sample_project(
    id: &str,
    title: &str,
    description: &str,
    image_url: &str,
    technologies: &[&str],
    github_url: &str,
    featured: bool,
) -> Project {
    Project {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        image_url: image_url.to_string(),
        technologies: technologies.iter().map(|tech| (*tech).to_string()).collect(),
        live_url: Some("https://example.com".to_string()),
        github_url: Some(github_url.to_string()),
        featured,
        created_at: None,
        updated_at: None,
    }
}

/// Sample projects, also shown as the fallback when no project exists.
pub fn sample_projects() -> Vec<Project> {
    vec![
        sample_project(
            "1",
            "Customer Churn Prediction Model",
            "Machine learning model to predict customer churn using Random Forest and XGBoost \
             algorithms. Achieved 92% accuracy with feature engineering and hyperparameter \
             tuning. Includes interactive dashboard for model insights.",
            "https://images.unsplash.com/photo-1551288049-bebda4e38f71?w=800&h=600&fit=crop",
            &["Python", "Scikit-learn", "Pandas", "Matplotlib", "Streamlit"],
            "https://github.com/yourusername/churn-prediction",
            true,
        ),
        sample_project(
            "2",
            "COVID-19 Data Analysis Dashboard",
            "Interactive dashboard analyzing global COVID-19 trends with real-time data \
             visualization. Features time-series analysis, predictive modeling, and \
             geographical heatmaps for infection rates and vaccination progress.",
            "https://images.unsplash.com/photo-1584036561566-baf8f5f1b144?w=800&h=600&fit=crop",
            &["Python", "Plotly", "Dash", "NumPy", "SQL"],
            "https://github.com/yourusername/covid-dashboard",
            true,
        ),
        sample_project(
            "3",
            "NLP Sentiment Analysis System",
            "Natural Language Processing system for sentiment analysis of product reviews and \
             social media posts. Uses BERT transformers and achieves 89% accuracy on \
             multi-class classification tasks.",
            "https://images.unsplash.com/photo-1455849318743-b2233052fcff?w=800&h=600&fit=crop",
            &["Python", "PyTorch", "Transformers", "NLTK", "Flask"],
            "https://github.com/yourusername/sentiment-analysis",
            false,
        ),
    ]
}
