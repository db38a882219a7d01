//! In-process [`SchoolStore`](super::SchoolStore) for handler tests.

use std::sync::{Mutex, MutexGuard};

use super::class::db::ClassStore;
use super::class::Class;
use super::student::db::StudentStore;
use super::student::{Student, StudentUpdate};
use super::teacher::db::TeacherStore;
use super::teacher::Teacher;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    teachers: Mutex<Vec<Teacher>>,
    classes: Mutex<Vec<Class>>,
    students: Mutex<Vec<Student>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn student_count(&self) -> usize {
        lock(&self.students).len()
    }
}

#[rocket::async_trait]
impl TeacherStore for MemoryStore {
    async fn create_teacher(&self, teacher: Teacher) -> Result<Teacher, StoreError> {
        let mut teachers = lock(&self.teachers);
        if teachers.iter().any(|it| it.email == teacher.email) {
            return Err(StoreError::Conflict { field: "email" });
        }
        teachers.push(teacher.clone());
        Ok(teacher)
    }

    async fn get_teacher(&self, id: bson::Uuid) -> Result<Option<Teacher>, StoreError> {
        Ok(lock(&self.teachers).iter().find(|it| it.id == id).cloned())
    }

    async fn find_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>, StoreError> {
        Ok(lock(&self.teachers).iter().find(|it| it.email == email).cloned())
    }
}

#[rocket::async_trait]
impl ClassStore for MemoryStore {
    async fn create_class(&self, class: Class) -> Result<Class, StoreError> {
        lock(&self.classes).push(class.clone());
        Ok(class)
    }

    async fn get_class(&self, id: bson::Uuid) -> Result<Option<Class>, StoreError> {
        Ok(lock(&self.classes).iter().find(|it| it.id == id).cloned())
    }

    async fn get_classes(&self, ids: &[bson::Uuid]) -> Result<Vec<Class>, StoreError> {
        Ok(lock(&self.classes)
            .iter()
            .filter(|it| ids.contains(&it.id))
            .cloned()
            .collect())
    }
}

#[rocket::async_trait]
impl StudentStore for MemoryStore {
    async fn create_student(&self, student: Student) -> Result<Student, StoreError> {
        let mut students = lock(&self.students);
        if students.iter().any(|it| it.email == student.email) {
            return Err(StoreError::Conflict { field: "email" });
        }
        students.push(student.clone());
        Ok(student)
    }

    async fn get_student(&self, id: bson::Uuid) -> Result<Option<Student>, StoreError> {
        Ok(lock(&self.students).iter().find(|it| it.id == id).cloned())
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError> {
        Ok(lock(&self.students).iter().find(|it| it.email == email).cloned())
    }

    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        Ok(lock(&self.students).clone())
    }

    async fn update_student(
        &self,
        id: bson::Uuid,
        update: StudentUpdate,
    ) -> Result<Option<Student>, StoreError> {
        update.validate()?;

        let mut students = lock(&self.students);
        if let Some(email) = &update.email {
            if students.iter().any(|it| it.id != id && &it.email == email) {
                return Err(StoreError::Conflict { field: "email" });
            }
        }

        Ok(students.iter_mut().find(|it| it.id == id).map(|student| {
            update.apply(student);
            student.clone()
        }))
    }

    async fn delete_student(&self, id: bson::Uuid) -> Result<Option<Student>, StoreError> {
        let mut students = lock(&self.students);
        Ok(students
            .iter()
            .position(|it| it.id == id)
            .map(|index| students.remove(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(email: &str) -> Student {
        Student {
            id: bson::Uuid::new(),
            first_name: "Eva".to_string(),
            last_name: "Jurić".to_string(),
            class: None,
            parent_name: "Petar Jurić".to_string(),
            address: "Frankopanska 3".to_string(),
            city: "Karlovac".to_string(),
            email: email.to_string(),
            password: "hash".to_string(),
        }
    }

    #[rocket::async_test]
    async fn finds_students_by_email() {
        let store = MemoryStore::default();
        let eva = store.create_student(student("eva@example.com")).await.unwrap();
        store.create_student(student("ivo@example.com")).await.unwrap();

        let found = store
            .find_student_by_email("eva@example.com")
            .await
            .unwrap()
            .expect("student should be found");
        assert_eq!(found, eva);

        assert!(store
            .find_student_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[rocket::async_test]
    async fn email_lookup_follows_updates() {
        let store = MemoryStore::default();
        let eva = store.create_student(student("eva@example.com")).await.unwrap();

        let update = StudentUpdate {
            email: Some("eva.j@example.com".to_string()),
            ..Default::default()
        };
        store.update_student(eva.id, update).await.unwrap();

        assert!(store.find_student_by_email("eva@example.com").await.unwrap().is_none());
        let moved = store.find_student_by_email("eva.j@example.com").await.unwrap();
        assert_eq!(moved.map(|it| it.id), Some(eva.id));
    }
}
